use std::sync::Arc;

use crate::compose::cache::FrameCache;
use crate::compose::canvas::{CompositedFrame, Compositor};
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::decoded::DecodedImage;

/// Composited frames on demand: cache first, otherwise fold the compositor forward.
///
/// The compositor only ever runs ahead to the requested index, so memory grows with the frames
/// actually reached rather than the whole animation up front. Once the last frame has been
/// composited the rolling canvas is released and every later request is a cache hit.
#[derive(Debug)]
pub struct FrameStore {
    compositor: Compositor,
    cache: Arc<FrameCache>,
}

impl FrameStore {
    /// Create a store with an empty cache.
    pub fn new(image: Arc<DecodedImage>) -> Self {
        let cache = Arc::new(FrameCache::new(image.frame_count()));
        Self {
            compositor: Compositor::new(image),
            cache,
        }
    }

    /// Shared handle to the underlying cache.
    pub fn cache(&self) -> Arc<FrameCache> {
        self.cache.clone()
    }

    /// Number of frames in the sequence.
    pub fn frame_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of frames the compositor has produced (each at most once).
    pub fn composited_count(&self) -> u64 {
        self.compositor.composited_count()
    }

    /// `true` once the compositor has folded through the last frame and dropped its canvas.
    pub fn is_fully_cached(&self) -> bool {
        self.compositor.is_finished()
    }

    /// Return the composited frame at `index`.
    pub fn frame(&mut self, index: usize) -> ApngResult<Arc<CompositedFrame>> {
        if index >= self.cache.len() {
            return Err(ApngError::malformed_sequence(format!(
                "frame {index} requested from a {}-frame sequence",
                self.cache.len()
            )));
        }
        if let Some(hit) = self.cache.get(index) {
            return Ok(hit);
        }
        if index < self.compositor.next_index() {
            return Err(ApngError::invalid_state(format!(
                "frame {index} was composited but is missing from the cache"
            )));
        }
        loop {
            let produced = self.compositor.composite_next()?;
            let at = produced.index() as usize;
            let shared = self.cache.insert(produced)?;
            if self.compositor.is_finished() {
                self.compositor.release();
                tracing::debug!(frames = self.cache.len(), "released compositing canvas");
            }
            if at == index {
                return Ok(shared);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/store.rs"]
mod tests;
