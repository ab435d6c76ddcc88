//! Scripted transcript replay.
//!
//! A script is JSON Lines, one step per line:
//!
//! ```text
//! {"step":"fragment","text":"the quick","final":false}
//! {"step":"error","message":"no speech detected"}
//! {"step":"pause"}
//! {"step":"resume"}
//! {"step":"end"}
//! {"step":"stop"}
//! ```
//!
//! Speech steps go through the `SpeechFeed`, so they obey the same
//! subscription gate a live recognizer would. Blank lines and lines
//! starting with `#` are ignored.

use std::path::Path;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use readcoach_core::{
    ReadingSessionEngine, SessionStatus, SessionSummary, SpeechError, SpeechEvent, SpeechFeed,
    TranscriptFragment,
};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum ScriptStep {
    Fragment {
        text: String,
        #[serde(default, rename = "final")]
        is_final: bool,
    },
    Error {
        message: String,
        #[serde(default)]
        fatal: bool,
    },
    End,
    Pause,
    Resume,
    Stop,
}

impl ScriptStep {
    fn speech_event(&self) -> Option<SpeechEvent> {
        match self {
            Self::Fragment { text, is_final } => Some(SpeechEvent::Fragment(
                TranscriptFragment::from_text(text, *is_final),
            )),
            Self::Error { message, fatal } => Some(SpeechEvent::Error(SpeechError {
                message: message.clone(),
                fatal: *fatal,
            })),
            Self::End => Some(SpeechEvent::EndOfStream),
            Self::Pause | Self::Resume | Self::Stop => None,
        }
    }
}

/// How a replay ended.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub summary: Option<SessionSummary>,
    pub final_status: SessionStatus,
    /// Speech steps rejected by the feed because the session was not listening.
    pub dropped_steps: usize,
}

pub fn parse_script(raw: &str) -> Result<Vec<ScriptStep>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str::<ScriptStep>(line)
                .with_context(|| format!("invalid script step on line {}", i + 1))
        })
        .collect()
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    parse_script(&raw)
}

/// Drive `engine` through `steps`. The session must already be started.
///
/// A session still listening when the script runs out is stopped, so every
/// replay of a started session ends scored. A `stop` step after the text
/// was read to the end is a no-op.
pub fn run_script(
    engine: &mut ReadingSessionEngine,
    feed: &SpeechFeed,
    events: &Receiver<SpeechEvent>,
    steps: &[ScriptStep],
) -> Result<ReplayReport> {
    let mut summary = None;
    let mut dropped_steps = 0usize;

    for (i, step) in steps.iter().enumerate() {
        debug!(step = i + 1, ?step, "replaying script step");
        match step.speech_event() {
            Some(event) => {
                if !feed.push(event) {
                    dropped_steps += 1;
                    continue;
                }
                if let Some(done) = engine.pump(events)? {
                    summary = Some(done);
                }
            }
            None => match step {
                ScriptStep::Pause => engine
                    .pause()
                    .with_context(|| format!("script step {} (pause)", i + 1))?,
                ScriptStep::Resume => engine
                    .resume()
                    .with_context(|| format!("script step {} (resume)", i + 1))?,
                _ if engine.status() == SessionStatus::Completed => {
                    debug!(step = i + 1, "session already completed — stop ignored");
                }
                _ => {
                    let done = engine
                        .stop()
                        .with_context(|| format!("script step {} (stop)", i + 1))?;
                    summary = Some(done);
                }
            },
        }
    }

    if engine.status() == SessionStatus::Listening {
        info!("script ended with the session still listening — stopping");
        summary = Some(engine.stop()?);
    }

    Ok(ReplayReport {
        summary,
        final_status: engine.status(),
        dropped_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use readcoach_core::{channel_source, EngineConfig, MemorySessionLog, WordStatus};

    fn engine_for(text: &str) -> (ReadingSessionEngine, SpeechFeed, Receiver<SpeechEvent>) {
        let (source, feed, rx) = channel_source();
        let mut engine = ReadingSessionEngine::new(
            EngineConfig::default(),
            Box::new(source),
            Box::new(MemorySessionLog::new()),
        );
        engine.start(text).expect("start");
        (engine, feed, rx)
    }

    #[test]
    fn parses_steps_and_skips_comments() {
        let steps = parse_script(
            r#"
            # warm-up
            {"step":"fragment","text":"the quick"}
            {"step":"fragment","text":"the quick brown","final":true}
            {"step":"error","message":"mic glitch"}
            {"step":"pause"}
            {"step":"end"}
            "#,
        )
        .expect("parse");
        assert_eq!(steps.len(), 5);
        assert_eq!(
            steps[0],
            ScriptStep::Fragment {
                text: "the quick".into(),
                is_final: false
            }
        );
        assert_eq!(
            steps[2],
            ScriptStep::Error {
                message: "mic glitch".into(),
                fatal: false
            }
        );
        assert_eq!(steps[3], ScriptStep::Pause);
    }

    #[test]
    fn bad_line_reports_its_number() {
        let err = parse_script("{\"step\":\"pause\"}\n{\"step\":\"dance\"}")
            .expect_err("unknown step");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn replay_reaches_completion_on_final_fragment() {
        let (mut engine, feed, rx) = engine_for("the quick brown fox");
        let steps = parse_script(
            r#"{"step":"fragment","text":"the quick"}
{"step":"fragment","text":"the quick brown fox","final":true}"#,
        )
        .expect("parse");

        let report = run_script(&mut engine, &feed, &rx, &steps).expect("replay");
        assert_eq!(report.final_status, SessionStatus::Completed);
        assert_eq!(report.dropped_steps, 0);
        let summary = report.summary.expect("summary");
        assert!((summary.score.accuracy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fragments_while_paused_are_dropped() {
        let (mut engine, feed, rx) = engine_for("the quick brown fox");
        let steps = vec![
            ScriptStep::Fragment {
                text: "the quick".into(),
                is_final: true,
            },
            ScriptStep::Pause,
            ScriptStep::Fragment {
                text: "brown".into(),
                is_final: true,
            },
            ScriptStep::Resume,
            ScriptStep::Stop,
        ];

        let report = run_script(&mut engine, &feed, &rx, &steps).expect("replay");
        assert_eq!(report.dropped_steps, 1);
        let snapshot = engine.snapshot().expect("snapshot");
        let statuses: Vec<WordStatus> = snapshot.word_results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                WordStatus::Correct,
                WordStatus::Correct,
                WordStatus::Skipped,
                WordStatus::Skipped
            ]
        );
        assert!(report.summary.is_some());
    }

    #[test]
    fn unfinished_script_is_stopped_and_scored() {
        let (mut engine, feed, rx) = engine_for("the quick brown fox");
        let steps = vec![ScriptStep::Fragment {
            text: "the".into(),
            is_final: true,
        }];
        let report = run_script(&mut engine, &feed, &rx, &steps).expect("replay");
        assert_eq!(report.final_status, SessionStatus::Completed);
        let summary = report.summary.expect("summary");
        assert!((summary.score.accuracy - 0.25).abs() < 1e-9);
    }

    #[test]
    fn fatal_error_leaves_session_in_error() {
        let (mut engine, feed, rx) = engine_for("the quick brown fox");
        let steps = vec![ScriptStep::Error {
            message: "permission revoked".into(),
            fatal: true,
        }];
        let report = run_script(&mut engine, &feed, &rx, &steps).expect("replay");
        assert_eq!(report.final_status, SessionStatus::Error);
        assert!(report.summary.is_none());
    }

    #[test]
    fn stop_after_reading_to_the_end_keeps_the_summary() {
        let (mut engine, feed, rx) = engine_for("the quick brown fox");
        let steps = parse_script(
            r#"{"step":"fragment","text":"the quick brown fox","final":true}
{"step":"stop"}"#,
        )
        .expect("parse");

        let report = run_script(&mut engine, &feed, &rx, &steps).expect("replay");
        assert_eq!(report.final_status, SessionStatus::Completed);
        let summary = report.summary.expect("summary");
        assert!((summary.score.accuracy - 1.0).abs() < 1e-9);
        assert_eq!(engine.last_summary(), Some(&summary));
    }

    #[test]
    fn invalid_control_step_is_an_error() {
        let (mut engine, feed, rx) = engine_for("the quick brown fox");
        let err = run_script(&mut engine, &feed, &rx, &[ScriptStep::Resume])
            .expect_err("resume while listening");
        assert!(err.to_string().contains("step 1"));
    }
}
