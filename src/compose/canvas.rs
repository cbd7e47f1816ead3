use std::sync::Arc;

use crate::compose::blend::{over_region, premultiply_rgba8_in_place, replace_region};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::decoded::DecodedImage;
use crate::model::frame::{BlendOp, DisposeOp};

/// A fully resolved, canvas-sized frame ready for display.
///
/// Pixels are straight-alpha RGBA8, tightly packed and row-major, in the same form the frame
/// pixel sources deliver them. A composited frame is
/// never mutated after it is produced; it is shared as `Arc<CompositedFrame>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositedFrame {
    index: u32,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CompositedFrame {
    pub(crate) fn from_parts(index: u32, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            index,
            width,
            height,
            data,
        }
    }

    /// Sequence index this snapshot was taken for.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Width in pixels (canvas width).
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels (canvas height).
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Straight-alpha RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Copy of the pixels converted to premultiplied alpha, for toolkits that upload that form.
    pub fn to_premultiplied_rgba(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        premultiply_rgba8_in_place(&mut out);
        out
    }

    /// Copy as an [`image::RgbaImage`] for export or display toolkits.
    pub fn to_rgba_image(&self) -> ApngResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(
            || ApngError::malformed_frame(format!("frame {} buffer size mismatch", self.index)),
        )
    }
}

/// Mutable canvas state threaded through the sequential fold over frames.
#[derive(Debug)]
struct CanvasState {
    buffer: Vec<u8>,
    saved_for_previous: Option<Vec<u8>>,
}

/// Stateful APNG compositor.
///
/// Frames are composited strictly in order: frame `i` can only be produced after `0..i` have
/// been folded into the canvas. Each call to [`Compositor::composite_next`] blends the next
/// frame, snapshots the canvas, then applies the frame's dispose operator.
#[derive(Debug)]
pub struct Compositor {
    image: Arc<DecodedImage>,
    state: Option<CanvasState>,
    next_index: usize,
    composited: u64,
}

impl Compositor {
    /// Create a compositor over a validated image with a fully transparent canvas.
    pub fn new(image: Arc<DecodedImage>) -> Self {
        let buffer = vec![0u8; image.canvas().byte_len()];
        Self {
            image,
            state: Some(CanvasState {
                buffer,
                saved_for_previous: None,
            }),
            next_index: 0,
            composited: 0,
        }
    }

    /// Index of the frame the next call to [`Compositor::composite_next`] will produce.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// `true` once every frame has been composited.
    pub fn is_finished(&self) -> bool {
        self.next_index >= self.image.frame_count()
    }

    /// Number of frames composited so far.
    pub fn composited_count(&self) -> u64 {
        self.composited
    }

    /// The working canvas (straight alpha), or `None` after [`Compositor::release`].
    pub fn canvas(&self) -> Option<&[u8]> {
        self.state.as_ref().map(|s| s.buffer.as_slice())
    }

    /// Drop the working buffers. Further compositing fails with `InvalidState`.
    pub fn release(&mut self) {
        self.state = None;
    }

    /// Composite the next frame in sequence and return its snapshot.
    pub fn composite_next(&mut self) -> ApngResult<CompositedFrame> {
        let idx = self.next_index;
        let canvas = self.image.canvas();
        let frame = self.image.frames().get(idx).ok_or_else(|| {
            ApngError::malformed_sequence(format!(
                "frame {idx} requested past the end of a {}-frame sequence",
                self.image.frame_count()
            ))
        })?;
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| ApngError::invalid_state("compositor canvas was released"))?;

        let region_px = frame.read_pixels()?;

        if frame.dispose_op() == DisposeOp::Previous {
            match state.saved_for_previous.as_mut() {
                Some(saved) => saved.copy_from_slice(&state.buffer),
                None => state.saved_for_previous = Some(state.buffer.clone()),
            }
        }

        let region = frame.region();
        if idx == 0 || frame.blend_op() == BlendOp::Source {
            replace_region(canvas, &mut state.buffer, region, &region_px);
        } else {
            over_region(canvas, &mut state.buffer, region, &region_px);
        }

        let snapshot =
            CompositedFrame::from_parts(idx as u32, canvas.width, canvas.height, state.buffer.clone());

        match frame.dispose_op() {
            DisposeOp::None => {}
            DisposeOp::Background => state.buffer.fill(0),
            DisposeOp::Previous => {
                if let Some(saved) = state.saved_for_previous.as_ref() {
                    state.buffer.copy_from_slice(saved);
                }
            }
        }

        tracing::debug!(
            frame = idx,
            blend = ?frame.blend_op(),
            dispose = ?frame.dispose_op(),
            "composited frame"
        );
        self.next_index += 1;
        self.composited += 1;
        Ok(snapshot)
    }

    /// Canvas dimensions.
    pub fn canvas_size(&self) -> Canvas {
        self.image.canvas()
    }
}

/// Composite every frame of `image` in order.
pub fn composite_all(image: Arc<DecodedImage>) -> ApngResult<Vec<CompositedFrame>> {
    let mut c = Compositor::new(image);
    let mut out = Vec::new();
    while !c.is_finished() {
        out.push(c.composite_next()?);
    }
    c.release();
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/canvas.rs"]
mod tests;
