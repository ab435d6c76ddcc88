//! Channel-backed speech source.
//!
//! ```text
//! recognizer callback ─► SpeechFeed::push ─► crossbeam channel ─► engine.pump(&rx)
//!                              │
//!                        gate (Mutex<bool>) — closed while unsubscribed
//! ```
//!
//! `unsubscribe()` closes the gate and drains whatever is still queued, so
//! fragments recognized before a pause are never applied after a resume.
//! The gate lock is held across check+send and across close+drain; a send
//! either lands before the drain or is refused.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::debug;

use super::{SpeechEvent, SpeechSource};
use crate::error::Result;

/// Producer half, held by whatever delivers recognizer output.
#[derive(Debug, Clone)]
pub struct SpeechFeed {
    tx: Sender<SpeechEvent>,
    open: Arc<Mutex<bool>>,
}

impl SpeechFeed {
    /// Queue an event. Returns `false` (and drops the event) while the
    /// engine is not subscribed or the engine side is gone.
    pub fn push(&self, event: SpeechEvent) -> bool {
        let open = self.open.lock();
        if !*open {
            debug!("speech feed closed — event dropped");
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }
}

/// The `SpeechSource` the engine owns.
#[derive(Debug)]
pub struct ChannelSpeechSource {
    open: Arc<Mutex<bool>>,
    /// Clone of the consumer half, used only to discard stale events.
    rx: Receiver<SpeechEvent>,
}

impl SpeechSource for ChannelSpeechSource {
    fn subscribe(&mut self) -> Result<()> {
        *self.open.lock() = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        let mut open = self.open.lock();
        *open = false;
        let discarded = self.rx.try_iter().count();
        if discarded > 0 {
            debug!(discarded, "discarded queued speech events on unsubscribe");
        }
    }

    fn is_subscribed(&self) -> bool {
        *self.open.lock()
    }
}

/// Create a matched source / feed / receiver triple over an unbounded channel.
///
/// Give the source to the engine, the feed to the recognizer, and pump the
/// receiver from the host loop.
pub fn channel_source() -> (ChannelSpeechSource, SpeechFeed, Receiver<SpeechEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let open = Arc::new(Mutex::new(false));
    let source = ChannelSpeechSource {
        open: Arc::clone(&open),
        rx: rx.clone(),
    };
    (source, SpeechFeed { tx, open }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TranscriptFragment;

    #[test]
    fn feed_drops_events_until_subscribed() {
        let (mut source, feed, rx) = channel_source();
        let event = SpeechEvent::Fragment(TranscriptFragment::interim(["hi"]));

        assert!(!feed.push(event.clone()));
        assert!(rx.try_recv().is_err());

        source.subscribe().expect("subscribe");
        assert!(feed.is_open());
        assert!(feed.push(event.clone()));
        assert_eq!(rx.try_recv().expect("queued event"), event);
    }

    #[test]
    fn unsubscribe_discards_queued_events() {
        let (mut source, feed, rx) = channel_source();
        source.subscribe().expect("subscribe");
        feed.push(SpeechEvent::EndOfStream);
        feed.push(SpeechEvent::EndOfStream);

        source.unsubscribe();
        assert!(!source.is_subscribed());
        assert!(rx.try_recv().is_err());
        assert!(!feed.push(SpeechEvent::EndOfStream));
    }

    #[test]
    fn nothing_from_a_concurrent_feed_survives_unsubscribe() {
        let (mut source, feed, rx) = channel_source();
        source.subscribe().expect("subscribe");

        let recognizer = std::thread::spawn(move || {
            let mut accepted = 0usize;
            while feed.push(SpeechEvent::Fragment(TranscriptFragment::interim(["hi"]))) {
                accepted += 1;
            }
            accepted
        });

        while rx.len() < 64 {
            std::thread::yield_now();
        }
        source.unsubscribe();
        let accepted = recognizer.join().expect("recognizer thread");

        assert!(accepted >= 64);
        assert!(rx.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
