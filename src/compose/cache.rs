use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::compose::canvas::CompositedFrame;
use crate::foundation::error::{ApngError, ApngResult};

/// Write-once-per-index store of composited frames.
///
/// Each slot is filled at most once and never mutated afterwards, so readers on any thread can
/// share entries without locking. A loop restart or backward seek reads from here instead of
/// re-running the compositor.
#[derive(Debug)]
pub struct FrameCache {
    slots: Box<[OnceLock<Arc<CompositedFrame>>]>,
    hits: AtomicU64,
}

impl FrameCache {
    /// Create an empty cache with one slot per frame.
    pub fn new(frame_count: usize) -> Self {
        Self {
            slots: (0..frame_count).map(|_| OnceLock::new()).collect(),
            hits: AtomicU64::new(0),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when the cache has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots already filled.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.get().is_some()).count()
    }

    /// Number of successful lookups so far.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Look up a frame. Only fully written entries are ever observed.
    pub fn get(&self, index: usize) -> Option<Arc<CompositedFrame>> {
        let hit = self.slots.get(index)?.get().cloned();
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Freeze `frame` into its slot and return the shared entry.
    ///
    /// If the slot is already filled the existing entry wins and is returned unchanged.
    pub fn insert(&self, frame: CompositedFrame) -> ApngResult<Arc<CompositedFrame>> {
        let index = frame.index() as usize;
        let slot = self.slots.get(index).ok_or_else(|| {
            ApngError::malformed_sequence(format!(
                "frame {index} does not fit a cache of {} frames",
                self.slots.len()
            ))
        })?;
        Ok(slot.get_or_init(|| Arc::new(frame)).clone())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/cache.rs"]
mod tests;
