//! Event channel implementation using crossbeam-channel.
//!
//! Lets the single-threaded core hand progress to a UI thread.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Sending half handed to the archiver.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Send an event, discarding it if the receiver is gone.
    ///
    /// Progress reporting is optional; an archive run never fails because
    /// nobody is listening.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half held by a UI layer.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is dropped
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Iterate until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel. Archive events are small, one per file at most.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }

    /// Bounded channel; the archiver blocks when a slow UI falls behind.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose receiver is already dropped, for runs without a UI.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
