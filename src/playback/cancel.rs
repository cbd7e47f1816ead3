use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, after, bounded, select};

/// Cooperative cancellation flag for one playback session.
///
/// The flag moves `false -> true` exactly once. Cancelling also wakes a session blocked in
/// [`CancelToken::sleep`] immediately rather than letting it wait out the frame delay.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                wake_tx,
                wake_rx,
            }),
        }
    }

    /// Request cancellation. Returns `true` for the call that actually flipped the flag.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::AcqRel);
        if first {
            let _ = self.inner.wake_tx.try_send(());
        }
        first
    }

    /// `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Sleep for `delay` unless cancelled first.
    ///
    /// Returns `true` when the full delay elapsed and `false` when cancelled (before or during
    /// the wait).
    pub fn sleep(&self, delay: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if delay.is_zero() {
            return true;
        }
        select! {
            recv(self.inner.wake_rx) -> _ => false,
            recv(after(delay)) -> _ => !self.is_cancelled(),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/cancel.rs"]
mod tests;
