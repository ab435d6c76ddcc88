//! Session scoring: accuracy plus the words to practise next.

use serde::{Deserialize, Serialize};

use crate::{
    session::{WordResult, WordStatus},
    text::normalize_word,
};

/// Default cap on practice words surfaced per session.
pub const DEFAULT_MAX_PRACTICE_WORDS: usize = 20;

/// Final score of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScore {
    pub total_words: usize,
    pub correct_words: usize,
    pub incorrect_words: usize,
    pub skipped_words: usize,
    /// `correct_words / total_words` in [0.0, 1.0].
    pub accuracy: f64,
    /// Distinct words marked incorrect or skipped, in first-seen order, in
    /// their matching form: lowercased, punctuation stripped, apostrophes
    /// folded to `'`.
    pub practice_words: Vec<String>,
}

/// Pure scorer; `finalize` may be called any number of times.
#[derive(Debug, Clone, Copy)]
pub struct AccuracyScorer {
    max_practice_words: usize,
}

impl Default for AccuracyScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PRACTICE_WORDS)
    }
}

impl AccuracyScorer {
    pub fn new(max_practice_words: usize) -> Self {
        Self { max_practice_words }
    }

    pub fn finalize(&self, results: &[WordResult]) -> SessionScore {
        let total_words = results.len();
        let mut correct_words = 0usize;
        let mut incorrect_words = 0usize;
        let mut skipped_words = 0usize;
        let mut practice_words: Vec<String> = Vec::new();

        for result in results {
            match result.status {
                WordStatus::Correct => correct_words += 1,
                WordStatus::Incorrect => incorrect_words += 1,
                WordStatus::Skipped => skipped_words += 1,
                WordStatus::Pending => {}
            }

            if result.status.needs_practice() && practice_words.len() < self.max_practice_words {
                let word = normalize_word(&result.expected_word);
                if !word.is_empty() && !practice_words.contains(&word) {
                    practice_words.push(word);
                }
            }
        }

        let accuracy = if total_words == 0 {
            0.0
        } else {
            correct_words as f64 / total_words as f64
        };

        SessionScore {
            total_words,
            correct_words,
            incorrect_words,
            skipped_words,
            accuracy,
            practice_words,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn result(word: &str, status: WordStatus) -> WordResult {
        WordResult {
            expected_word: word.into(),
            status,
            matched_transcript_word: None,
            resolved_at: None,
        }
    }

    #[test]
    fn all_correct_scores_one_with_no_practice_words() {
        let results = vec![
            result("the", WordStatus::Correct),
            result("fox", WordStatus::Correct),
        ];
        let score = AccuracyScorer::default().finalize(&results);
        assert_relative_eq!(score.accuracy, 1.0);
        assert!(score.practice_words.is_empty());
        assert_eq!(score.correct_words, 2);
    }

    #[test]
    fn practice_words_are_lowercased_deduplicated_and_ordered() {
        let results = vec![
            result("The", WordStatus::Skipped),
            result("quick", WordStatus::Correct),
            result("Fox", WordStatus::Incorrect),
            result("the", WordStatus::Incorrect),
        ];
        let score = AccuracyScorer::default().finalize(&results);
        assert_eq!(score.practice_words, vec!["the", "fox"]);
        assert_relative_eq!(score.accuracy, 0.25);
        assert_eq!(score.incorrect_words, 2);
        assert_eq!(score.skipped_words, 1);
    }

    #[test]
    fn curly_and_straight_apostrophes_are_one_practice_word() {
        let results = vec![
            result("don\u{2019}t", WordStatus::Skipped),
            result("stop,", WordStatus::Incorrect),
            result("don't", WordStatus::Incorrect),
        ];
        let score = AccuracyScorer::default().finalize(&results);
        assert_eq!(score.practice_words, vec!["don't", "stop"]);
    }

    #[test]
    fn practice_words_are_capped() {
        let results: Vec<WordResult> = (0..30)
            .map(|i| result(&format!("word{i}"), WordStatus::Incorrect))
            .collect();
        let score = AccuracyScorer::new(20).finalize(&results);
        assert_eq!(score.practice_words.len(), 20);
        assert_eq!(score.practice_words[0], "word0");
        assert_eq!(score.practice_words[19], "word19");
    }

    #[test]
    fn pending_words_count_against_accuracy_but_are_not_practice_words() {
        let results = vec![
            result("one", WordStatus::Correct),
            result("two", WordStatus::Pending),
        ];
        let score = AccuracyScorer::default().finalize(&results);
        assert_relative_eq!(score.accuracy, 0.5);
        assert!(score.practice_words.is_empty());
    }

    #[test]
    fn empty_input_scores_zero() {
        let score = AccuracyScorer::default().finalize(&[]);
        assert_eq!(score.total_words, 0);
        assert_relative_eq!(score.accuracy, 0.0);
    }

    #[test]
    fn finalize_is_idempotent() {
        let results = vec![
            result("one", WordStatus::Correct),
            result("two", WordStatus::Skipped),
        ];
        let scorer = AccuracyScorer::default();
        assert_eq!(scorer.finalize(&results), scorer.finalize(&results));
    }
}
