//! # readcoach-core
//!
//! Reading-session engine SDK: aligns a live speech-recognition transcript
//! against a reference text, word by word, and scores the attempt.
//!
//! ## Architecture
//!
//! ```text
//! SpeechSource ─► SpeechEvent ─► ReadingSessionEngine
//!                                   │  SessionStateMachine gate (Listening only)
//!                                   ▼
//!                           TranscriptAligner ─► WordUpdate deltas
//!                                   │                 │
//!                                   │       LiveFeedbackGenerator
//!                                   │                 │
//!                                   │      broadcast::Sender<WordProgressEvent>
//!                                   ▼
//!                    stop / end of text ─► AccuracyScorer ─► SessionLogSink
//! ```
//!
//! The engine owns the only mutable session; everything else sees snapshots
//! and broadcast events.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod ipc;
pub mod session;
pub mod sink;
pub mod source;
pub mod text;

// Convenience re-exports for downstream crates
pub use engine::{EngineConfig, EventOutcome, ReadingSessionEngine, SessionSummary};
pub use error::ReadingError;
pub use ipc::events::{
    AdvisoryEvent, AdvisoryKind, SessionStatus, SessionStatusEvent, WordProgressEvent,
};
pub use session::{SessionSnapshot, WordResult, WordStatus, WordUpdate};
pub use sink::{MemorySessionLog, SessionLogSink, SessionRecord};
pub use source::{
    channel_source, ChannelSpeechSource, SpeechError, SpeechEvent, SpeechFeed, SpeechSource,
    TranscriptFragment,
};
