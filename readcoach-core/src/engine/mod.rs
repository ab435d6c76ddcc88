//! `ReadingSessionEngine` — the facade hosts talk to.
//!
//! ## Lifecycle
//!
//! ```text
//! ReadingSessionEngine::new()
//!     └─► start(text)    → session allocated, source subscribed, status = Listening
//!         ├─► pause()    → source unsubscribed, status = Paused
//!         │   └─► resume() → source subscribed, status = Listening
//!         ├─► stop()     → pending words skipped, scored, logged, status = Completed
//!         └─► fatal speech error → source unsubscribed, status = Error
//!             └─► restart() → fresh session for the same text, status = Idle
//!                 └─► begin() → that session starts listening
//! ```
//!
//! Every operation returns `ReadingError::InvalidTransition` when called in
//! a state that does not allow it. Transcript fragments are the exception:
//! outside `Listening` they are dropped and reported as
//! `EventOutcome::Dropped`, never buffered.
//!
//! ## Threading
//!
//! The engine is a single logical consumer: every method takes `&mut self`
//! and runs to completion. Hosts serialize speech events through their own
//! loop (see [`ReadingSessionEngine::pump`]); observers use the broadcast
//! subscriptions and `snapshot()`.

pub mod aligner;
pub mod feedback;
pub mod scorer;
pub mod state;

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    error::{ReadingError, Result},
    ipc::events::{AdvisoryEvent, AdvisoryKind, SessionStatusEvent, WordProgressEvent},
    session::{ReadingSession, SessionSnapshot, WordUpdate},
    sink::{SessionLogSink, SessionRecord},
    source::{SpeechEvent, SpeechSource, TranscriptFragment},
    text::ReferenceText,
};

use self::{
    feedback::{LiveFeedback, LiveFeedbackGenerator},
    scorer::{AccuracyScorer, SessionScore, DEFAULT_MAX_PRACTICE_WORDS},
    state::{SessionAction, SessionStateMachine},
};

pub use crate::ipc::events::SessionStatus;

/// Broadcast channel capacity: events buffered for slow subscribers.
const BROADCAST_CAP: usize = 256;

/// Default lookahead: the current word plus two more, so up to two
/// omitted words are tolerated.
pub const DEFAULT_LOOKAHEAD_WINDOW: usize = 3;

/// Configuration for `ReadingSessionEngine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Reference tokens examined for each transcript word, counting the
    /// current one. `1` disables skip tolerance. Clamped to 1..=8.
    pub lookahead_window: usize,
    /// Cap on practice words reported per session. Clamped to 1..=200.
    pub max_practice_words: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookahead_window: DEFAULT_LOOKAHEAD_WINDOW,
            max_practice_words: DEFAULT_MAX_PRACTICE_WORDS,
        }
    }
}

impl EngineConfig {
    pub fn normalized(mut self) -> Self {
        self.lookahead_window = self.lookahead_window.clamp(1, 8);
        self.max_practice_words = self.max_practice_words.clamp(1, 200);
        self
    }
}

/// Result of a completed session, also the source of its log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub score: SessionScore,
    pub duration_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}

/// What happened to one speech event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// The session was not listening; the event was discarded.
    Dropped,
    /// The fragment was aligned; these word results changed (possibly none).
    Applied(Vec<WordUpdate>),
    /// The fragment finished the reference text and the session completed.
    Completed(SessionSummary),
    /// Surfaced to the UI as an advisory; no state change.
    Advisory(AdvisoryKind),
    /// A fatal recognizer error moved the session to `Error`.
    Failed,
}

/// The top-level reading-session handle.
pub struct ReadingSessionEngine {
    config: EngineConfig,
    state: SessionStateMachine,
    session: Option<ReadingSession>,
    source: Box<dyn SpeechSource>,
    sink: Box<dyn SessionLogSink>,
    scorer: AccuracyScorer,
    feedback: LiveFeedbackGenerator,
    last_summary: Option<SessionSummary>,
    status_tx: broadcast::Sender<SessionStatusEvent>,
    progress_tx: broadcast::Sender<WordProgressEvent>,
    advisory_tx: broadcast::Sender<AdvisoryEvent>,
    /// Monotonically increasing progress-event sequence counter.
    seq: u64,
}

impl ReadingSessionEngine {
    /// Create an idle engine. No session exists until `start()`.
    pub fn new(
        config: EngineConfig,
        source: Box<dyn SpeechSource>,
        sink: Box<dyn SessionLogSink>,
    ) -> Self {
        let config = config.normalized();
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (progress_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (advisory_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            scorer: AccuracyScorer::new(config.max_practice_words),
            config,
            state: SessionStateMachine::new(),
            session: None,
            source,
            sink,
            feedback: LiveFeedbackGenerator,
            last_summary: None,
            status_tx,
            progress_tx,
            advisory_tx,
            seq: 0,
        }
    }

    /// Begin a session over `reference_text` and subscribe to the speech source.
    ///
    /// Replaces any session prepared by `restart()` / `restart_with()`.
    ///
    /// # Errors
    /// - `ReadingError::InvalidTransition` unless the engine is idle.
    /// - `ReadingError::EmptyReferenceText` if the text holds no words; no
    ///   session is created.
    /// - The source's error if it cannot subscribe; the session is then in
    ///   `Error`.
    pub fn start(&mut self, reference_text: &str) -> Result<()> {
        self.state.check(SessionAction::Start)?;
        let reference = ReferenceText::parse(reference_text)?;
        self.session = Some(ReadingSession::new(reference, self.config.lookahead_window));
        self.begin_session()
    }

    /// Begin the session prepared by `restart()` or `restart_with()`, over
    /// the reference text it was bound to.
    ///
    /// # Errors
    /// - `ReadingError::InvalidTransition` unless the engine is idle.
    /// - `ReadingError::NoPreparedSession` if no session has been prepared.
    /// - The source's error if it cannot subscribe.
    pub fn begin(&mut self) -> Result<()> {
        self.state.check(SessionAction::Start)?;
        if self.session.is_none() {
            return Err(ReadingError::NoPreparedSession);
        }
        self.begin_session()
    }

    /// Stop accepting transcript; progress is kept as-is.
    pub fn pause(&mut self) -> Result<()> {
        self.state.check(SessionAction::Pause)?;
        self.source.unsubscribe();
        self.live_session_mut().aligner_mut().commit();
        self.state.apply(SessionAction::Pause)?;
        info!(cursor = self.live_session().cursor(), "reading session paused");
        self.publish_status(None);
        Ok(())
    }

    /// Re-subscribe and continue from the current cursor.
    pub fn resume(&mut self) -> Result<()> {
        self.state.apply(SessionAction::Resume)?;
        info!(cursor = self.live_session().cursor(), "reading session resumed");
        self.publish_status(None);
        self.subscribe_source()
    }

    /// Finish the session: remaining words become skipped, the score is
    /// computed and one record goes to the session log.
    pub fn stop(&mut self) -> Result<SessionSummary> {
        self.state.check(SessionAction::Complete)?;
        self.complete()
    }

    /// Discard the finished (or failed) session and prepare a fresh one for
    /// the same reference text. The engine is left idle.
    pub fn restart(&mut self) -> Result<()> {
        self.state.check(SessionAction::Restart)?;
        let reference = self.live_session().reference().clone();
        self.reset_to(reference)
    }

    /// Like `restart()`, but bound to a new reference text.
    pub fn restart_with(&mut self, reference_text: &str) -> Result<()> {
        self.state.check(SessionAction::Restart)?;
        let reference = ReferenceText::parse(reference_text)?;
        self.reset_to(reference)
    }

    /// Apply one transcript fragment.
    ///
    /// Fragments arriving outside `Listening` are dropped. A final fragment
    /// that leaves no reference word unresolved completes the session.
    pub fn on_transcript_fragment(&mut self, fragment: TranscriptFragment) -> Result<EventOutcome> {
        if !self.state.accepts_transcript() {
            debug!(
                status = %self.state.status(),
                words = fragment.words.len(),
                "fragment dropped — session not listening"
            );
            return Ok(EventOutcome::Dropped);
        }

        let session = self.live_session_mut();
        let updates = session
            .aligner_mut()
            .consume(fragment.words.as_slice(), fragment.is_final);
        let cursor = session.cursor();
        let exhausted = session.is_exhausted();
        let session_id = session.id().to_string();

        if !updates.is_empty() {
            let feedback = self.feedback.feedback_for(&updates);
            self.publish_progress(session_id, cursor, updates.clone(), feedback);
        }

        if fragment.is_final && exhausted {
            info!("reference text read to the end");
            return self.complete().map(EventOutcome::Completed);
        }
        Ok(EventOutcome::Applied(updates))
    }

    /// Route any speech-source event.
    pub fn on_speech_event(&mut self, event: SpeechEvent) -> Result<EventOutcome> {
        match event {
            SpeechEvent::Fragment(fragment) => self.on_transcript_fragment(fragment),
            SpeechEvent::EndOfStream => {
                if !self.state.accepts_transcript() {
                    return Ok(EventOutcome::Dropped);
                }
                self.live_session_mut().aligner_mut().commit();
                self.publish_advisory(AdvisoryKind::SourceEnded, "speech source ended".into());
                Ok(EventOutcome::Advisory(AdvisoryKind::SourceEnded))
            }
            SpeechEvent::Error(err) if err.fatal => match self.state.status() {
                SessionStatus::Listening | SessionStatus::Paused => {
                    self.fail(err.message)?;
                    Ok(EventOutcome::Failed)
                }
                _ => {
                    debug!(message = %err.message, "fatal speech error ignored — no live session");
                    Ok(EventOutcome::Dropped)
                }
            },
            SpeechEvent::Error(err) => {
                if !self.state.accepts_transcript() {
                    return Ok(EventOutcome::Dropped);
                }
                debug!(message = %err.message, "transient speech error");
                self.publish_advisory(AdvisoryKind::TransientSpeechError, err.message);
                Ok(EventOutcome::Advisory(AdvisoryKind::TransientSpeechError))
            }
        }
    }

    /// Process every event currently queued on `events`, in arrival order.
    ///
    /// Returns the summary if the session completed while pumping.
    pub fn pump(&mut self, events: &Receiver<SpeechEvent>) -> Result<Option<SessionSummary>> {
        let mut completed = None;
        while let Ok(event) = events.try_recv() {
            if let EventOutcome::Completed(summary) = self.on_speech_event(event)? {
                completed = Some(summary);
            }
        }
        Ok(completed)
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// Read-only copy of the current session, if one exists.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.session
            .as_ref()
            .map(|s| s.snapshot(self.state.status()))
    }

    /// Summary of the most recently completed session.
    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    /// Whether the speech source is currently subscribed.
    pub fn is_listening_to_source(&self) -> bool {
        self.source.is_subscribed()
    }

    /// Subscribe to status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<SessionStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to word-progress events.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<WordProgressEvent> {
        self.progress_tx.subscribe()
    }

    /// Subscribe to advisory events.
    pub fn subscribe_advisories(&self) -> broadcast::Receiver<AdvisoryEvent> {
        self.advisory_tx.subscribe()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn begin_session(&mut self) -> Result<()> {
        let session = self.live_session_mut();
        session.mark_started(Utc::now());
        info!(
            session_id = session.id(),
            words = session.word_results().len(),
            "reading session started"
        );
        self.last_summary = None;

        self.state.apply(SessionAction::Start)?;
        self.publish_status(None);
        self.subscribe_source()
    }

    fn complete(&mut self) -> Result<SessionSummary> {
        self.source.unsubscribe();

        let completed_at = Utc::now();
        let session = self.live_session_mut();
        let closing = session.aligner_mut().close();
        session.mark_completed(completed_at);
        let session_id = session.id().to_string();
        let cursor = session.cursor();
        let duration_ms = session.duration_ms();
        let started_at = session.started_at();
        let score = self.scorer.finalize(self.live_session().word_results());

        self.state.apply(SessionAction::Complete)?;

        if !closing.is_empty() {
            self.publish_progress(session_id.clone(), cursor, closing, None);
        }
        self.publish_status(None);

        let record = SessionRecord::reading(session_id.clone(), &score, duration_ms, completed_at);
        if let Err(e) = self.sink.append(&record) {
            warn!(session_id = %session_id, "failed to write session log: {e}");
            self.publish_advisory(AdvisoryKind::SessionLogFailed, e.to_string());
        }

        info!(
            session_id = %session_id,
            accuracy = format_args!("{:.3}", score.accuracy),
            correct = score.correct_words,
            total = score.total_words,
            practice = score.practice_words.len(),
            duration_ms,
            "reading session completed"
        );

        let summary = SessionSummary {
            session_id,
            score,
            duration_ms,
            started_at,
            completed_at,
        };
        self.last_summary = Some(summary.clone());
        Ok(summary)
    }

    fn fail(&mut self, detail: String) -> Result<()> {
        self.source.unsubscribe();
        self.live_session_mut().aligner_mut().commit();
        self.state.apply(SessionAction::Fail)?;
        warn!(detail = %detail, "reading session failed");
        self.publish_status(Some(detail));
        Ok(())
    }

    fn reset_to(&mut self, reference: ReferenceText) -> Result<()> {
        self.source.unsubscribe();
        self.session = Some(ReadingSession::new(reference, self.config.lookahead_window));
        self.state.apply(SessionAction::Restart)?;
        info!("reading session reset");
        self.publish_status(None);
        Ok(())
    }

    fn subscribe_source(&mut self) -> Result<()> {
        if let Err(e) = self.source.subscribe() {
            self.fail(e.to_string())?;
            return Err(e);
        }
        Ok(())
    }

    /// The session behind any non-idle status. Its absence is an engine bug.
    fn live_session(&self) -> &ReadingSession {
        match self.session.as_ref() {
            Some(session) => session,
            None => unreachable!("session status {} without a session", self.state.status()),
        }
    }

    fn live_session_mut(&mut self) -> &mut ReadingSession {
        let status = self.state.status();
        match self.session.as_mut() {
            Some(session) => session,
            None => unreachable!("session status {status} without a session"),
        }
    }

    fn session_id(&self) -> Option<String> {
        self.session.as_ref().map(|s| s.id().to_string())
    }

    fn publish_status(&self, detail: Option<String>) {
        let _ = self.status_tx.send(SessionStatusEvent {
            session_id: self.session_id(),
            status: self.state.status(),
            detail,
        });
    }

    fn publish_progress(
        &mut self,
        session_id: String,
        cursor: usize,
        updates: Vec<WordUpdate>,
        feedback: Option<LiveFeedback>,
    ) {
        let event = WordProgressEvent {
            seq: self.seq,
            session_id,
            cursor,
            updates,
            feedback,
        };
        self.seq = self.seq.saturating_add(1);
        let _ = self.progress_tx.send(event);
    }

    fn publish_advisory(&self, kind: AdvisoryKind, message: String) {
        let _ = self.advisory_tx.send(AdvisoryEvent {
            session_id: self.session_id(),
            kind,
            message,
        });
    }
}

impl std::fmt::Debug for ReadingSessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingSessionEngine")
            .field("config", &self.config)
            .field("status", &self.state.status())
            .field("session_id", &self.session_id())
            .finish_non_exhaustive()
    }
}
