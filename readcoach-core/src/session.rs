//! Reading-session data model.
//!
//! A `ReadingSession` is owned by exactly one `ReadingSessionEngine`.
//! Word results are only ever mutated through the session's
//! `TranscriptAligner`; everything handed outside the engine is a
//! `SessionSnapshot` clone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::aligner::TranscriptAligner;
use crate::ipc::events::SessionStatus;
use crate::text::ReferenceText;

/// Classification of one reference word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    /// Not reached yet.
    Pending,
    Correct,
    /// Attempted but misread.
    Incorrect,
    /// Omitted by the reader, or never reached before the session completed.
    Skipped,
}

impl WordStatus {
    pub fn is_resolved(self) -> bool {
        self != WordStatus::Pending
    }

    /// Whether the word should be surfaced for later practice.
    pub fn needs_practice(self) -> bool {
        matches!(self, WordStatus::Incorrect | WordStatus::Skipped)
    }
}

/// Live result for one reference word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordResult {
    /// Reference word as written (outer punctuation trimmed).
    pub expected_word: String,
    pub status: WordStatus,
    /// Normalized transcript word that resolved this result, if any.
    pub matched_transcript_word: Option<String>,
    /// Logical resolution sequence number; `None` while pending.
    pub resolved_at: Option<u64>,
}

impl WordResult {
    pub fn pending(expected_word: impl Into<String>) -> Self {
        Self {
            expected_word: expected_word.into(),
            status: WordStatus::Pending,
            matched_transcript_word: None,
            resolved_at: None,
        }
    }
}

/// One change to a word result, as produced by the aligner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordUpdate {
    /// Position in the reference text.
    pub index: usize,
    /// Status before this update.
    pub previous: WordStatus,
    /// Result after this update.
    pub result: WordResult,
}

/// The aggregate root for one read-aloud attempt.
#[derive(Debug)]
pub struct ReadingSession {
    id: String,
    reference: ReferenceText,
    aligner: TranscriptAligner,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl ReadingSession {
    pub(crate) fn new(reference: ReferenceText, lookahead_window: usize) -> Self {
        let aligner = TranscriptAligner::new(&reference, lookahead_window);
        Self {
            id: new_session_id(),
            reference,
            aligner,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn reference(&self) -> &ReferenceText {
        &self.reference
    }

    pub fn word_results(&self) -> &[WordResult] {
        self.aligner.results()
    }

    pub fn cursor(&self) -> usize {
        self.aligner.cursor()
    }

    /// `true` once every reference word has been resolved.
    pub fn is_exhausted(&self) -> bool {
        self.aligner.is_exhausted()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub(crate) fn aligner_mut(&mut self) -> &mut TranscriptAligner {
        &mut self.aligner
    }

    pub(crate) fn mark_started(&mut self, at: DateTime<Utc>) {
        self.started_at = Some(at);
    }

    pub(crate) fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
    }

    /// Wall-clock milliseconds between start and completion (0 if either is unset).
    pub fn duration_ms(&self) -> u64 {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as u64,
            _ => 0,
        }
    }

    pub(crate) fn snapshot(&self, status: SessionStatus) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            reference_text: self.reference.as_str().to_string(),
            status,
            cursor: self.cursor(),
            word_results: self.word_results().to_vec(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Read-only view of a session for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub reference_text: String,
    pub status: SessionStatus,
    pub cursor: usize,
    pub word_results: Vec<WordResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn new_session_id() -> String {
    format!(
        "read-{}-{:08x}",
        Utc::now().timestamp_micros(),
        rand::random::<u32>()
    )
}
