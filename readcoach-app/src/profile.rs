//! Learner profile derived from the session log.
//!
//! Reads only the record contract (`accuracy`, `data.practiceWords`,
//! `completedAt`), so it works on any sink's output.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use readcoach_core::SessionRecord;
use serde::Serialize;

const RECENT_WINDOW: usize = 5;
const MAX_PROFILE_WORDS: usize = 20;
const HARDER_THRESHOLD: f64 = 0.9;
const EASIER_THRESHOLD: f64 = 0.6;
const MIN_SESSIONS_FOR_HARDER: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easier,
    Steady,
    Harder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeWord {
    pub word: String,
    pub misses: usize,
    pub last_missed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub total_sessions: usize,
    pub mean_accuracy: f64,
    pub recent_accuracy: f64,
    pub practice_words: Vec<PracticeWord>,
    pub recommendation: Difficulty,
}

impl LearnerProfile {
    /// Build a profile from records in any order.
    pub fn from_records(records: &[SessionRecord]) -> Self {
        let mut ordered: Vec<&SessionRecord> = records.iter().collect();
        ordered.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        let total_sessions = ordered.len();
        let mean_accuracy = mean(ordered.iter().map(|r| r.accuracy));
        let recent_accuracy = mean(ordered.iter().take(RECENT_WINDOW).map(|r| r.accuracy));

        let mut misses: HashMap<&str, PracticeWord> = HashMap::new();
        for record in &ordered {
            for word in &record.data.practice_words {
                misses
                    .entry(word.as_str())
                    .and_modify(|p| p.misses += 1)
                    .or_insert_with(|| PracticeWord {
                        word: word.clone(),
                        misses: 1,
                        last_missed: record.completed_at,
                    });
            }
        }
        let mut practice_words: Vec<PracticeWord> = misses.into_values().collect();
        practice_words.sort_by(|a, b| {
            b.misses
                .cmp(&a.misses)
                .then(b.last_missed.cmp(&a.last_missed))
                .then(a.word.cmp(&b.word))
        });
        practice_words.truncate(MAX_PROFILE_WORDS);

        let recommendation = if total_sessions >= MIN_SESSIONS_FOR_HARDER
            && recent_accuracy >= HARDER_THRESHOLD
        {
            Difficulty::Harder
        } else if total_sessions > 0 && recent_accuracy < EASIER_THRESHOLD {
            Difficulty::Easier
        } else {
            Difficulty::Steady
        };

        Self {
            total_sessions,
            mean_accuracy,
            recent_accuracy,
            practice_words,
            recommendation,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use readcoach_core::sink::{ReadingData, SessionType};

    fn record(accuracy: f64, hours_ago: i64, practice: &[&str]) -> SessionRecord {
        SessionRecord {
            session_type: SessionType::ReadingCoach,
            session_id: format!("read-{hours_ago}"),
            accuracy,
            duration_ms: 0,
            completed_at: Utc::now() - Duration::hours(hours_ago),
            data: ReadingData {
                total_words: 10,
                correct_words: 0,
                practice_words: practice.iter().map(|w| w.to_string()).collect(),
            },
        }
    }

    #[test]
    fn empty_history_is_steady() {
        let profile = LearnerProfile::from_records(&[]);
        assert_eq!(profile.total_sessions, 0);
        assert_eq!(profile.mean_accuracy, 0.0);
        assert!(profile.practice_words.is_empty());
        assert_eq!(profile.recommendation, Difficulty::Steady);
    }

    #[test]
    fn recent_accuracy_uses_latest_five() {
        let mut records: Vec<SessionRecord> = (1..=5).map(|h| record(1.0, h, &[])).collect();
        records.push(record(0.0, 100, &[]));

        let profile = LearnerProfile::from_records(&records);
        assert_eq!(profile.total_sessions, 6);
        assert!((profile.recent_accuracy - 1.0).abs() < 1e-9);
        assert!((profile.mean_accuracy - 5.0 / 6.0).abs() < 1e-9);
        assert_eq!(profile.recommendation, Difficulty::Harder);
    }

    #[test]
    fn strong_but_short_history_stays_steady() {
        let records = vec![record(1.0, 1, &[]), record(0.95, 2, &[])];
        let profile = LearnerProfile::from_records(&records);
        assert_eq!(profile.recommendation, Difficulty::Steady);
    }

    #[test]
    fn weak_recent_accuracy_recommends_easier() {
        let records = vec![record(0.4, 1, &["through"]), record(0.5, 2, &["though"])];
        let profile = LearnerProfile::from_records(&records);
        assert_eq!(profile.recommendation, Difficulty::Easier);
    }

    #[test]
    fn practice_words_ranked_by_misses_then_recency() {
        let records = vec![
            record(0.8, 10, &["quick", "brown"]),
            record(0.8, 5, &["quick"]),
            record(0.8, 1, &["fox"]),
        ];
        let profile = LearnerProfile::from_records(&records);
        let words: Vec<&str> = profile
            .practice_words
            .iter()
            .map(|p| p.word.as_str())
            .collect();
        assert_eq!(words, vec!["quick", "fox", "brown"]);
        assert_eq!(profile.practice_words[0].misses, 2);
        assert_eq!(
            profile.practice_words[0].last_missed,
            records[1].completed_at
        );
    }

    #[test]
    fn practice_words_are_capped() {
        let words: Vec<String> = (0..30).map(|i| format!("word{i}")).collect();
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let profile = LearnerProfile::from_records(&[record(0.5, 1, &refs)]);
        assert_eq!(profile.practice_words.len(), MAX_PROFILE_WORDS);
    }

    #[test]
    fn serializes_recommendation_lowercase() {
        let profile = LearnerProfile::from_records(&[record(0.3, 1, &[])]);
        let json = serde_json::to_value(&profile).expect("serialize profile");
        assert_eq!(json["recommendation"], "easier");
        assert!(json.get("totalSessions").is_some());
    }
}
