//! Speech source abstraction.
//!
//! The `SpeechSource` trait decouples the engine from any particular
//! recognizer (platform ASR plugin, cloud stream, scripted replay). The
//! engine only controls the subscription; recognized words come back as
//! `SpeechEvent`s that the host hands to
//! `ReadingSessionEngine::on_speech_event` (or `pump`) in arrival order.

pub mod channel;

pub use channel::{channel_source, ChannelSpeechSource, SpeechFeed};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One incremental delivery of recognized words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptFragment {
    /// Recognized words for the in-progress utterance, in spoken order.
    pub words: Vec<String>,
    /// `true` when the recognizer has committed this utterance.
    pub is_final: bool,
}

impl TranscriptFragment {
    pub fn interim(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            is_final: false,
        }
    }

    pub fn final_words(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            is_final: true,
        }
    }

    /// Build a fragment from raw recognizer text, splitting on whitespace.
    pub fn from_text(text: &str, is_final: bool) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
            is_final,
        }
    }
}

/// Failure reported by the recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechError {
    pub message: String,
    /// Fatal errors (permission revoked, hardware gone) end the session in
    /// `error`; anything else is advisory.
    pub fatal: bool,
}

impl SpeechError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }
}

/// Everything a speech source can deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpeechEvent {
    Fragment(TranscriptFragment),
    EndOfStream,
    Error(SpeechError),
}

/// Contract for transcript providers.
pub trait SpeechSource: Send + 'static {
    /// Begin delivering events. Called on `start()` and `resume()`.
    ///
    /// # Errors
    /// Returns an error if the recognizer cannot be opened (e.g. the
    /// microphone permission was denied).
    fn subscribe(&mut self) -> Result<()>;

    /// Stop delivering events. Anything not yet consumed is discarded.
    fn unsubscribe(&mut self);

    fn is_subscribed(&self) -> bool;
}

/// Source for hosts that push fragments straight into
/// `ReadingSessionEngine::on_transcript_fragment` and manage the
/// recognizer themselves.
#[derive(Debug, Default)]
pub struct ManualSpeechSource {
    subscribed: bool,
}

impl SpeechSource for ManualSpeechSource {
    fn subscribe(&mut self) -> Result<()> {
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_event_uses_type_tag() {
        let event = SpeechEvent::Fragment(TranscriptFragment::final_words(["the", "fox"]));
        let json = serde_json::to_value(&event).expect("serialize speech event");
        assert_eq!(json["type"], "fragment");
        assert_eq!(json["isFinal"], true);
        assert_eq!(json["words"][1], "fox");

        let end: SpeechEvent =
            serde_json::from_str(r#"{"type":"endOfStream"}"#).expect("deserialize end");
        assert_eq!(end, SpeechEvent::EndOfStream);

        let err: SpeechEvent =
            serde_json::from_str(r#"{"type":"error","message":"mic gone","fatal":true}"#)
                .expect("deserialize error");
        assert_eq!(err, SpeechEvent::Error(SpeechError::fatal("mic gone")));
    }

    #[test]
    fn from_text_splits_on_whitespace() {
        let fragment = TranscriptFragment::from_text("  the quick\tbrown ", false);
        assert_eq!(fragment.words, vec!["the", "quick", "brown"]);
        assert!(!fragment.is_final);
    }
}
