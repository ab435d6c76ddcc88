use thiserror::Error;

use crate::engine::state::SessionAction;
use crate::ipc::events::SessionStatus;

/// All errors produced by readcoach-core.
#[derive(Debug, Error)]
pub enum ReadingError {
    #[error("reference text is empty — nothing to read")]
    EmptyReferenceText,

    #[error("no reading session is prepared — start with a reference text")]
    NoPreparedSession,

    #[error("cannot {action} a session that is {from}")]
    InvalidTransition {
        action: SessionAction,
        from: SessionStatus,
    },

    #[error("speech source error: {0}")]
    SpeechSource(String),

    #[error("session log error: {0}")]
    SessionLog(String),
}

pub type Result<T> = std::result::Result<T, ReadingError>;
