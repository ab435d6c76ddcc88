//! Session lifecycle state machine.
//!
//! ```text
//!            start           pause
//!   Idle ───────────► Listening ◄────► Paused
//!    ▲                 │    resume       │
//!    │ restart         │ complete        │
//!    │                 ▼                 │ fail
//!    ├──────────── Completed             │
//!    │                                   ▼
//!    └──────────────────────────────── Error ◄── fail (from Listening)
//! ```
//!
//! The edge table in [`next_status`] is the only place status changes are
//! decided; `SessionStateMachine` is the only holder of the current status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReadingError, Result};
use crate::ipc::events::SessionStatus;

/// Requests that move a session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
    /// Explicit stop, or the reference text was read to the end.
    Complete,
    /// The transcript source reported a fatal failure.
    Fail,
    Restart,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionAction::Start => "start",
            SessionAction::Pause => "pause",
            SessionAction::Resume => "resume",
            SessionAction::Complete => "complete",
            SessionAction::Fail => "fail",
            SessionAction::Restart => "restart",
        };
        f.write_str(name)
    }
}

/// The transition table. `None` means the action is not allowed from `from`.
pub fn next_status(from: SessionStatus, action: SessionAction) -> Option<SessionStatus> {
    use SessionAction as A;
    use SessionStatus as S;

    match (from, action) {
        (S::Idle, A::Start) => Some(S::Listening),
        (S::Listening, A::Pause) => Some(S::Paused),
        (S::Paused, A::Resume) => Some(S::Listening),
        (S::Listening, A::Complete) => Some(S::Completed),
        (S::Listening | S::Paused, A::Fail) => Some(S::Error),
        (S::Error | S::Completed, A::Restart) => Some(S::Idle),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct SessionStateMachine {
    status: SessionStatus,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether transcript fragments should be applied right now.
    pub fn accepts_transcript(&self) -> bool {
        self.status == SessionStatus::Listening
    }

    /// Check an action without applying it.
    pub fn check(&self, action: SessionAction) -> Result<SessionStatus> {
        next_status(self.status, action).ok_or(ReadingError::InvalidTransition {
            action,
            from: self.status,
        })
    }

    /// Apply an action, returning the new status.
    ///
    /// # Errors
    /// `ReadingError::InvalidTransition` when the edge does not exist; the
    /// status is left unchanged.
    pub fn apply(&mut self, action: SessionAction) -> Result<SessionStatus> {
        let next = self.check(action)?;
        self.status = next;
        Ok(next)
    }
}
