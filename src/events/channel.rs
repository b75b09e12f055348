//! Crossbeam-backed event delivery.
//!
//! The session engine never waits on a listener: sends go to an unbounded
//! queue and are dropped once the receiving side has gone away.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Engine side of an event channel. Cheap to clone into the preview thread.
#[derive(Clone, Debug)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn send(&self, event: Event) {
        tracing::trace!(%event, "event");
        // No listener is fine
        let _ = self.inner.send(event);
    }
}

/// UI side of an event channel
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Blocks until an event arrives; ends once every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }

    /// Everything queued right now, oldest first
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }
}

pub struct EventChannel;

impl EventChannel {
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose events go nowhere
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
