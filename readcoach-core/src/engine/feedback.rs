//! Short, ephemeral feedback strings for the live reading view.
//!
//! Derived from the latest aligner delta only. Nothing here feeds scoring.

use serde::{Deserialize, Serialize};

use crate::session::{WordStatus, WordUpdate};

const PRAISE: &str = "Great job!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTone {
    Praise,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeedback {
    pub tone: FeedbackTone,
    /// Reference word the feedback is about.
    pub word: String,
    pub message: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LiveFeedbackGenerator;

impl LiveFeedbackGenerator {
    /// Feedback for the most recently resolved word in `updates`, if any.
    pub fn feedback_for(&self, updates: &[WordUpdate]) -> Option<LiveFeedback> {
        let latest = updates
            .iter()
            .filter(|u| u.result.status.is_resolved())
            .max_by_key(|u| (u.result.resolved_at, u.index))?;

        let word = latest.result.expected_word.clone();
        let feedback = match latest.result.status {
            WordStatus::Correct => LiveFeedback {
                tone: FeedbackTone::Praise,
                message: PRAISE.to_string(),
                word,
            },
            WordStatus::Incorrect | WordStatus::Skipped => LiveFeedback {
                tone: FeedbackTone::Retry,
                message: format!("Try again: {word}"),
                word,
            },
            WordStatus::Pending => return None,
        };
        Some(feedback)
    }
}
