//! Online, forward-only alignment of a live transcript against reference text.
//!
//! ## Algorithm (per transcript word, starting at the committed position)
//!
//! ```text
//! word == ref[pos]                      → ref[pos] correct,          pos += 1
//! word == ref[pos + j], 0 < j < window  → ref[pos..pos+j] skipped,
//!                                         ref[pos + j] correct,      pos += j + 1
//! otherwise                             → ref[pos] incorrect,        pos += 1
//! ```
//!
//! ## Interim vs final fragments
//!
//! Recognizers re-send the whole in-progress utterance on every interim
//! update, then close it with a final. Every fragment is therefore aligned
//! from `committed` (the end of the last final) into a proposal, which is
//! merged into the live results:
//!
//! - pending words take the proposal;
//! - resolved words are never downgraded or reverted to pending;
//! - a final may upgrade an unconfirmed `incorrect`/`skipped` to `correct`;
//! - words behind `committed` are never touched again.
//!
//! Every word below `cursor` is resolved and every word at or after it is
//! pending, so new resolutions always land at increasing indices and take
//! increasing `resolved_at` values.

use tracing::debug;

use crate::session::{WordResult, WordStatus, WordUpdate};
use crate::text::{normalize_fragment, ReferenceText};

/// Classification proposed for one reference position by a single fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Proposal {
    index: usize,
    status: WordStatus,
    matched: Option<String>,
}

#[derive(Debug)]
pub struct TranscriptAligner {
    /// Normalized reference keys, one per result.
    expected: Vec<String>,
    results: Vec<WordResult>,
    /// Next unresolved reference position.
    cursor: usize,
    /// Positions below this were settled by a final fragment (or an
    /// explicit commit) and are never revised.
    committed: usize,
    /// Tokens examined from the current position, the current one included.
    lookahead_window: usize,
    next_seq: u64,
    closed: bool,
}

impl TranscriptAligner {
    pub fn new(reference: &ReferenceText, lookahead_window: usize) -> Self {
        let expected = reference
            .tokens()
            .iter()
            .map(|t| t.normalized.clone())
            .collect();
        let results = reference
            .tokens()
            .iter()
            .map(|t| WordResult::pending(t.surface.clone()))
            .collect();
        Self {
            expected,
            results,
            cursor: 0,
            committed: 0,
            lookahead_window: lookahead_window.max(1),
            next_seq: 0,
            closed: false,
        }
    }

    pub fn results(&self) -> &[WordResult] {
        &self.results
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    /// `true` once every reference word has been resolved.
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.results.len()
    }

    /// Apply one transcript fragment and return the word results it changed,
    /// in reference order.
    ///
    /// # Panics
    /// If the aligner was already closed, or if an internal invariant breaks.
    pub fn consume<S: AsRef<str>>(&mut self, words: &[S], is_final: bool) -> Vec<WordUpdate> {
        assert!(!self.closed, "transcript applied to a closed session");

        let tokens = normalize_fragment(words);
        let proposals = self.propose(&tokens);
        let mut updates = Vec::new();

        for proposal in proposals {
            let index = proposal.index;
            let previous = self.results[index].status;
            let apply = match previous {
                WordStatus::Pending => true,
                WordStatus::Incorrect | WordStatus::Skipped => {
                    is_final && index >= self.committed && proposal.status == WordStatus::Correct
                }
                WordStatus::Correct => false,
            };
            if !apply {
                continue;
            }

            let result = &mut self.results[index];
            if previous == WordStatus::Pending {
                result.resolved_at = Some(self.next_seq);
                self.next_seq += 1;
            }
            result.status = proposal.status;
            result.matched_transcript_word = proposal.matched;
            updates.push(WordUpdate {
                index,
                previous,
                result: result.clone(),
            });

            if previous == WordStatus::Pending {
                assert_eq!(
                    index, self.cursor,
                    "aligner resolved a word out of reference order"
                );
                self.cursor += 1;
            }
        }

        assert!(
            self.cursor <= self.results.len(),
            "aligner cursor {} exceeds reference length {}",
            self.cursor,
            self.results.len()
        );

        if is_final {
            self.committed = self.cursor;
        }

        debug!(
            transcript_words = tokens.len(),
            is_final,
            cursor = self.cursor,
            committed = self.committed,
            changed = updates.len(),
            "fragment aligned"
        );
        updates
    }

    /// Settle the in-progress utterance as if a final had confirmed it.
    pub fn commit(&mut self) {
        self.committed = self.cursor;
    }

    /// Force every still-pending word to `skipped`.
    ///
    /// Runs once; later calls return no updates. After closing, `consume`
    /// panics.
    pub fn close(&mut self) -> Vec<WordUpdate> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;
        self.committed = self.cursor;

        let mut updates = Vec::new();
        for (index, result) in self.results.iter_mut().enumerate().skip(self.cursor) {
            assert_eq!(
                result.status,
                WordStatus::Pending,
                "word {index} past the cursor is already resolved"
            );
            result.status = WordStatus::Skipped;
            result.resolved_at = Some(self.next_seq);
            self.next_seq += 1;
            updates.push(WordUpdate {
                index,
                previous: WordStatus::Pending,
                result: result.clone(),
            });
        }
        updates
    }

    /// Align `tokens` from the committed position without touching results.
    fn propose(&self, tokens: &[String]) -> Vec<Proposal> {
        let len = self.expected.len();
        let mut pos = self.committed;
        let mut out = Vec::new();

        for token in tokens {
            if pos >= len {
                debug!(extra = %token, "transcript word past end of reference ignored");
                continue;
            }

            if self.expected[pos] == *token {
                out.push(Proposal {
                    index: pos,
                    status: WordStatus::Correct,
                    matched: Some(token.clone()),
                });
                pos += 1;
                continue;
            }

            let window_end = (pos + self.lookahead_window).min(len);
            let hit = (pos + 1..window_end).find(|&i| self.expected[i] == *token);
            match hit {
                Some(hit) => {
                    for skipped in pos..hit {
                        out.push(Proposal {
                            index: skipped,
                            status: WordStatus::Skipped,
                            matched: None,
                        });
                    }
                    out.push(Proposal {
                        index: hit,
                        status: WordStatus::Correct,
                        matched: Some(token.clone()),
                    });
                    pos = hit + 1;
                }
                None => {
                    out.push(Proposal {
                        index: pos,
                        status: WordStatus::Incorrect,
                        matched: Some(token.clone()),
                    });
                    pos += 1;
                }
            }
        }
        out
    }
}
