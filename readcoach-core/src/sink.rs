//! Session-log output: one record per completed session.
//!
//! The record shape is the data contract the learner-profile consumer reads
//! (`accuracy` and `data.practiceWords`). How records are stored is up to
//! the `SessionLogSink` implementor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::engine::scorer::SessionScore;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    ReadingCoach,
}

/// Reading-specific payload of a session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingData {
    pub total_words: usize,
    pub correct_words: usize,
    pub practice_words: Vec<String>,
}

/// One finished session, as written to the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_type: SessionType,
    pub session_id: String,
    pub accuracy: f64,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
    pub data: ReadingData,
}

impl SessionRecord {
    pub fn reading(
        session_id: impl Into<String>,
        score: &SessionScore,
        duration_ms: u64,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_type: SessionType::ReadingCoach,
            session_id: session_id.into(),
            accuracy: score.accuracy,
            duration_ms,
            completed_at,
            data: ReadingData {
                total_words: score.total_words,
                correct_words: score.correct_words,
                practice_words: score.practice_words.clone(),
            },
        }
    }
}

/// Destination for finished-session records.
pub trait SessionLogSink: Send + 'static {
    /// Persist one record. Called exactly once per completed session.
    fn append(&mut self, record: &SessionRecord) -> Result<()>;
}

/// In-memory sink. Clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionLog {
    records: Arc<Mutex<Vec<SessionRecord>>>,
}

impl MemorySessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl SessionLogSink for MemorySessionLog {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score() -> SessionScore {
        SessionScore {
            total_words: 4,
            correct_words: 3,
            incorrect_words: 0,
            skipped_words: 1,
            accuracy: 0.75,
            practice_words: vec!["quick".into()],
        }
    }

    #[test]
    fn record_serializes_to_the_session_log_contract() {
        let record = SessionRecord::reading("read-1", &score(), 1_500, Utc::now());
        let json = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(json["sessionType"], "readingCoach");
        assert_eq!(json["sessionId"], "read-1");
        assert_eq!(json["durationMs"], 1_500);
        assert_eq!(json["data"]["totalWords"], 4);
        assert_eq!(json["data"]["correctWords"], 3);
        assert_eq!(json["data"]["practiceWords"][0], "quick");
        let accuracy = json["accuracy"].as_f64().expect("accuracy is a number");
        assert!((accuracy - 0.75).abs() < 1e-9);
    }

    #[test]
    fn memory_log_clones_share_records() {
        let log = MemorySessionLog::new();
        let mut writer = log.clone();
        writer
            .append(&SessionRecord::reading("read-1", &score(), 0, Utc::now()))
            .expect("append");
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].session_id, "read-1");
    }
}
