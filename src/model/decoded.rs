use std::time::Duration;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::frame::FrameDescriptor;
use crate::timing::delay::SpeedRatio;

/// A decoded APNG resource: canvas geometry plus the ordered frame descriptors.
///
/// Construction validates the whole sequence up front so the compositor can index frames
/// without re-checking bounds.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    canvas: Canvas,
    frames: Vec<FrameDescriptor>,
    is_single_frame: bool,
    num_plays: u32,
}

impl DecodedImage {
    /// Create a validated image.
    ///
    /// - [`ApngError::MalformedSequence`] when there are no frames, when a still image carries
    ///   more than one, or when `sequence_index` does not match the frame position.
    /// - [`ApngError::MalformedFrame`] when a frame region leaves the canvas.
    pub fn new(
        canvas: Canvas,
        frames: Vec<FrameDescriptor>,
        is_single_frame: bool,
        num_plays: u32,
    ) -> ApngResult<Self> {
        if frames.is_empty() {
            return Err(ApngError::malformed_sequence(if is_single_frame {
                "still image has no pixel data"
            } else {
                "animated image declares no frames"
            }));
        }
        if is_single_frame && frames.len() != 1 {
            return Err(ApngError::malformed_sequence(format!(
                "still image carries {} frames",
                frames.len()
            )));
        }
        for (pos, f) in frames.iter().enumerate() {
            if f.sequence_index() as usize != pos {
                return Err(ApngError::malformed_sequence(format!(
                    "frame at position {pos} has sequence index {}",
                    f.sequence_index()
                )));
            }
            let r = f.region();
            if !canvas.contains(r) {
                return Err(ApngError::malformed_frame(format!(
                    "frame {pos} region {}x{}+{}+{} exceeds canvas {}x{}",
                    r.width, r.height, r.x, r.y, canvas.width, canvas.height
                )));
            }
        }
        Ok(Self {
            canvas,
            frames,
            is_single_frame,
            num_plays,
        })
    }

    /// A plain still image with one full-canvas frame.
    pub fn still(canvas: Canvas, frame: FrameDescriptor) -> ApngResult<Self> {
        Self::new(canvas, vec![frame], true, 1)
    }

    /// An animated image. `num_plays == 0` means the file requests infinite looping.
    pub fn animated(canvas: Canvas, frames: Vec<FrameDescriptor>, num_plays: u32) -> ApngResult<Self> {
        Self::new(canvas, frames, false, num_plays)
    }

    /// Canvas geometry.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Frames in playback order.
    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// `true` when the resource has no animation control at all.
    pub fn is_single_frame(&self) -> bool {
        self.is_single_frame
    }

    /// Play count stored in the animation control chunk (`0` = infinite).
    pub fn num_plays(&self) -> u32 {
        self.num_plays
    }

    /// The first frame, exposed for static previews.
    pub fn default_frame(&self) -> &FrameDescriptor {
        &self.frames[0]
    }

    /// Sum of normalized frame delays for one pass through the sequence.
    pub fn total_duration(&self, speed: SpeedRatio) -> Duration {
        self.frames.iter().map(|f| f.delay().to_duration(speed)).sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/decoded.rs"]
mod tests;
