//! Event types broadcast by the engine to the host.
//!
//! ## Channels
//!
//! | Event | Subscription |
//! |-------|--------------|
//! | `SessionStatusEvent` | `ReadingSessionEngine::subscribe_status` |
//! | `WordProgressEvent` | `ReadingSessionEngine::subscribe_progress` |
//! | `AdvisoryEvent` | `ReadingSessionEngine::subscribe_advisories` |
//!
//! Field names serialize as camelCase and enum tags as lowercase so hosts
//! can forward them verbatim to a web view.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::feedback::LiveFeedback;
use crate::session::WordUpdate;

// ---------------------------------------------------------------------------
// Status events
// ---------------------------------------------------------------------------

/// Lifecycle state of the current reading session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No session running; `start()` is allowed.
    #[default]
    Idle,
    /// Accepting transcript fragments.
    Listening,
    /// Progress kept, transcript ignored until `resume()`.
    Paused,
    /// Scored and logged; results are frozen.
    Completed,
    /// Transcript source failed; results kept for display, `restart()` required.
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Listening => "listening",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Emitted whenever the session status changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub session_id: Option<String>,
    pub status: SessionStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Emitted for every fragment (or completion) that changed word results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordProgressEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub session_id: String,
    /// Cursor after the updates were applied.
    pub cursor: usize,
    pub updates: Vec<WordUpdate>,
    pub feedback: Option<LiveFeedback>,
}

// ---------------------------------------------------------------------------
// Advisory events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdvisoryKind {
    /// Recoverable recognizer hiccup (e.g. momentary silence).
    TransientSpeechError,
    /// The speech source signalled end of stream.
    SourceEnded,
    /// The finished session could not be written to the session log.
    SessionLogFailed,
}

/// Non-fatal notices for the UI. Never changes session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryEvent {
    pub session_id: Option<String>,
    pub kind: AdvisoryKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::feedback::FeedbackTone;
    use crate::session::{WordResult, WordStatus};

    #[test]
    fn status_event_serializes_with_lowercase_status() {
        let event = SessionStatusEvent {
            session_id: Some("read-1".into()),
            status: SessionStatus::Listening,
            detail: None,
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["sessionId"], "read-1");
        assert_eq!(json["status"], "listening");
        assert!(json["detail"].is_null());

        let round_trip: SessionStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, SessionStatus::Listening);
    }

    #[test]
    fn progress_event_serializes_with_camel_case_fields() {
        let event = WordProgressEvent {
            seq: 3,
            session_id: "read-1".into(),
            cursor: 2,
            updates: vec![WordUpdate {
                index: 1,
                previous: WordStatus::Pending,
                result: WordResult {
                    expected_word: "quick".into(),
                    status: WordStatus::Incorrect,
                    matched_transcript_word: Some("slow".into()),
                    resolved_at: Some(1),
                },
            }],
            feedback: Some(LiveFeedback {
                tone: FeedbackTone::Retry,
                word: "quick".into(),
                message: "Try again: quick".into(),
            }),
        };

        let json = serde_json::to_value(&event).expect("serialize progress event");
        assert_eq!(json["cursor"], 2);
        assert_eq!(json["updates"][0]["previous"], "pending");
        assert_eq!(json["updates"][0]["result"]["expectedWord"], "quick");
        assert_eq!(json["updates"][0]["result"]["status"], "incorrect");
        assert_eq!(json["updates"][0]["result"]["matchedTranscriptWord"], "slow");
        assert_eq!(json["updates"][0]["result"]["resolvedAt"], 1);
        assert_eq!(json["feedback"]["tone"], "retry");
    }

    #[test]
    fn session_status_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<SessionStatus>(r#""Listening""#);
        assert!(err.is_err(), "expected invalid casing to fail");
    }

    #[test]
    fn advisory_kind_serializes_camel_case() {
        let json = serde_json::to_value(AdvisoryKind::TransientSpeechError).expect("serialize");
        assert_eq!(json, "transientSpeechError");
    }
}
