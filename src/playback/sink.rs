use std::sync::{Arc, Mutex};

use crate::compose::canvas::CompositedFrame;

/// Notifications emitted by a playback session, in schedule order.
#[derive(Clone, Debug)]
pub enum PlaybackEvent {
    /// The sequence (re)entered frame 0. Fires on every loop restart; never for still images.
    Started,
    /// A composited frame is due for display now.
    Frame(Arc<CompositedFrame>),
    /// The sequence finished naturally (no repeat). Never fires on cancellation.
    Ended,
    /// The display should drop its image (explicit unload or `UnloadOnEnd`).
    Unloaded,
    /// A compositing error terminated the session. Reported once.
    Failed(String),
}

impl PlaybackEvent {
    /// Short stable name, handy for logs and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Frame(_) => "frame",
            Self::Ended => "ended",
            Self::Unloaded => "unloaded",
            Self::Failed(_) => "failed",
        }
    }
}

/// Receiver of playback notifications.
///
/// Delivery is fire-and-forget: implementations must return promptly and never block the
/// playback loop waiting on a subscriber.
pub trait PlaybackSink: Send + Sync {
    /// Deliver one event.
    fn deliver(&self, event: PlaybackEvent);
}

impl PlaybackSink for crossbeam_channel::Sender<PlaybackEvent> {
    fn deliver(&self, event: PlaybackEvent) {
        // A dropped receiver just means nobody is watching anymore.
        if self.try_send(event).is_err() {
            tracing::trace!("playback event dropped: receiver gone or full");
        }
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    events: Mutex<Vec<PlaybackEvent>>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.lock().clone()
    }

    /// Event kinds received so far, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.lock().iter().map(PlaybackEvent::kind).collect()
    }

    /// Indices of the frames received so far, in order.
    pub fn frame_indices(&self) -> Vec<u32> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Frame(f) => Some(f.index()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PlaybackEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl PlaybackSink for InMemorySink {
    fn deliver(&self, event: PlaybackEvent) {
        self.lock().push(event);
    }
}

/// Shared sinks forward to the inner sink.
impl<S: PlaybackSink + ?Sized> PlaybackSink for Arc<S> {
    fn deliver(&self, event: PlaybackEvent) {
        (**self).deliver(event);
    }
}
