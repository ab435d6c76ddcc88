//! Word tokenizer shared by reference text and transcript fragments.
//!
//! ## Normalization
//!
//! 1. Curly apostrophes (`’`, `‘`) fold to `'`.
//! 2. Lowercase.
//! 3. Drop every character that is not alphanumeric or an apostrophe.
//! 4. Trim apostrophes from both ends (`'tis'` → `tis`, `don't` stays).
//!
//! Words are split on whitespace and on hyphens / dashes / slashes, so
//! `well-known` becomes two tokens, matching what recognizers emit.
//! A piece that normalizes to the empty string (e.g. `...`) is not a token.

use serde::{Deserialize, Serialize};

use crate::error::{ReadingError, Result};

/// One comparable word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// The word as written, with outer punctuation trimmed (`"Fox."` → `"Fox"`).
    pub surface: String,
    /// Normalized comparison key (`"fox"`).
    pub normalized: String,
}

/// Ordered, immutable token sequence for one reading session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceText {
    source: String,
    tokens: Vec<Token>,
}

impl ReferenceText {
    /// Tokenize `text` for a session.
    ///
    /// # Errors
    /// `ReadingError::EmptyReferenceText` when the text holds no words
    /// (empty, whitespace-only or punctuation-only).
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(ReadingError::EmptyReferenceText);
        }
        Ok(Self {
            source: text.to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The original text the session was created from.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Split `text` into tokens, dropping pieces with no word characters.
pub fn tokenize(text: &str) -> Vec<Token> {
    split_words(text)
        .filter_map(|piece| {
            let normalized = normalize_word(piece);
            if normalized.is_empty() {
                return None;
            }
            let surface = piece
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string();
            Some(Token {
                surface,
                normalized,
            })
        })
        .collect()
}

/// Normalize the words of one transcript fragment.
///
/// Entries may hold several whitespace-separated words (recognizers are not
/// consistent about this); each is split and normalized in order.
pub fn normalize_fragment<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    words
        .iter()
        .flat_map(|w| split_words(w.as_ref()).map(normalize_word).collect::<Vec<_>>())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Comparison key for a single word. Returns an empty string when the word
/// has no alphanumeric content.
pub fn normalize_word(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' => '\'',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || *c == '\'')
        .collect();
    folded.trim_matches('\'').to_string()
}

fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || matches!(c, '-' | '\u{2013}' | '\u{2014}' | '/'))
        .filter(|piece| !piece.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_punctuation() {
        assert_eq!(normalize_word("Fox."), "fox");
        assert_eq!(normalize_word("\"Hello,\""), "hello");
        assert_eq!(normalize_word("DON'T"), "don't");
        assert_eq!(normalize_word("don\u{2019}t"), "don't");
        assert_eq!(normalize_word("'tis'"), "tis");
        assert_eq!(normalize_word("..."), "");
    }

    #[test]
    fn tokenize_keeps_surface_form_without_outer_punctuation() {
        let tokens = tokenize("The quick, brown fox!");
        let surfaces: Vec<&str> = tokens.iter().map(|t| t.surface.as_str()).collect();
        let keys: Vec<&str> = tokens.iter().map(|t| t.normalized.as_str()).collect();
        assert_eq!(surfaces, vec!["The", "quick", "brown", "fox"]);
        assert_eq!(keys, vec!["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn tokenize_splits_hyphenated_words_and_drops_dashes() {
        let tokens = tokenize("a well-known tale — told twice");
        let keys: Vec<&str> = tokens.iter().map(|t| t.normalized.as_str()).collect();
        assert_eq!(keys, vec!["a", "well", "known", "tale", "told", "twice"]);
    }

    #[test]
    fn reference_text_rejects_wordless_input() {
        assert!(matches!(
            ReferenceText::parse(""),
            Err(ReadingError::EmptyReferenceText)
        ));
        assert!(matches!(
            ReferenceText::parse("   \n\t "),
            Err(ReadingError::EmptyReferenceText)
        ));
        assert!(matches!(
            ReferenceText::parse("... !!"),
            Err(ReadingError::EmptyReferenceText)
        ));
    }

    #[test]
    fn reference_text_preserves_source_and_order() {
        let reference = ReferenceText::parse("very very good").expect("parse reference");
        assert_eq!(reference.len(), 3);
        assert_eq!(reference.as_str(), "very very good");
        assert_eq!(reference.tokens()[0].normalized, "very");
        assert_eq!(reference.tokens()[1].normalized, "very");
    }

    #[test]
    fn normalize_fragment_splits_multi_word_entries() {
        let words = vec!["The quick".to_string(), "BROWN,".to_string(), "?".to_string()];
        assert_eq!(normalize_fragment(&words), vec!["the", "quick", "brown"]);
    }
}
