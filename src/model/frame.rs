use std::fmt;
use std::sync::Arc;

use crate::foundation::core::Region;
use crate::foundation::error::{ApngError, ApngResult};
use crate::timing::delay::DelayFraction;

/// How a frame's pixels combine with the canvas (fcTL `blend_op`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlendOp {
    /// Overwrite the region, alpha included.
    #[default]
    Source,
    /// Alpha-composite the region over the existing canvas.
    Over,
}

/// Canvas treatment after a frame is shown (fcTL `dispose_op`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DisposeOp {
    /// Leave the canvas as-is.
    #[default]
    None,
    /// Reset the canvas to fully transparent.
    Background,
    /// Revert the canvas to its state before this frame was blended.
    Previous,
}

/// Lazily readable raw pixels for one frame region.
///
/// Implementations return straight-alpha RGBA8, tightly packed and row-major, sized exactly to
/// the frame region. Reads must be idempotent: the compositor may read a source more than once
/// across player sessions.
pub trait PixelSource: Send + Sync + fmt::Debug {
    /// Materialize the region pixels.
    fn read_pixels(&self) -> ApngResult<Vec<u8>>;
}

/// Pixel source backed by an in-memory straight-alpha RGBA8 buffer.
#[derive(Clone)]
pub struct InlinePixels {
    rgba8: Arc<[u8]>,
}

impl InlinePixels {
    /// Wrap an already decoded straight-alpha RGBA8 buffer.
    pub fn new(rgba8: impl Into<Arc<[u8]>>) -> Self {
        Self {
            rgba8: rgba8.into(),
        }
    }

    /// A region filled with one straight-alpha color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let px = (width as usize) * (height as usize);
        Self::new(rgba.repeat(px))
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba8
    }
}

impl fmt::Debug for InlinePixels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlinePixels")
            .field("len", &self.rgba8.len())
            .finish()
    }
}

impl PixelSource for InlinePixels {
    fn read_pixels(&self) -> ApngResult<Vec<u8>> {
        Ok(self.rgba8.to_vec())
    }
}

/// One parsed APNG frame: placement, operators, delay and a handle to its pixels.
///
/// Immutable after construction. Canvas bounds are checked when the frame is collected into a
/// [`crate::DecodedImage`].
#[derive(Clone, Debug)]
pub struct FrameDescriptor {
    sequence_index: u32,
    region: Region,
    blend_op: BlendOp,
    dispose_op: DisposeOp,
    delay: DelayFraction,
    pixel_source: Arc<dyn PixelSource>,
}

impl FrameDescriptor {
    /// Create a validated frame descriptor.
    ///
    /// Fails with [`ApngError::MalformedFrame`] when the region is empty.
    pub fn new(
        sequence_index: u32,
        region: Region,
        blend_op: BlendOp,
        dispose_op: DisposeOp,
        delay: DelayFraction,
        pixel_source: Arc<dyn PixelSource>,
    ) -> ApngResult<Self> {
        if region.width == 0 || region.height == 0 {
            return Err(ApngError::malformed_frame(format!(
                "frame {sequence_index} has empty region {}x{}",
                region.width, region.height
            )));
        }
        Ok(Self {
            sequence_index,
            region,
            blend_op,
            dispose_op,
            delay,
            pixel_source,
        })
    }

    /// Position in playback order.
    pub fn sequence_index(&self) -> u32 {
        self.sequence_index
    }

    /// Placement of the frame on the canvas.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Blend operator.
    pub fn blend_op(&self) -> BlendOp {
        self.blend_op
    }

    /// Dispose operator.
    pub fn dispose_op(&self) -> DisposeOp {
        self.dispose_op
    }

    /// Raw delay fraction.
    pub fn delay(&self) -> DelayFraction {
        self.delay
    }

    /// Read this frame's region pixels, checking the payload size.
    pub fn read_pixels(&self) -> ApngResult<Vec<u8>> {
        let px = self.pixel_source.read_pixels()?;
        let expected = self.region.byte_len();
        if px.len() != expected {
            return Err(ApngError::malformed_frame(format!(
                "frame {} pixel payload is {} bytes, expected {expected}",
                self.sequence_index,
                px.len()
            )));
        }
        Ok(px)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/frame.rs"]
mod tests;
