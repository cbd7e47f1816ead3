use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::sync::Arc;

use crate::assets::decoder::{ImageDecoder, Resource};
use crate::foundation::core::{Canvas, Region};
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::decoded::DecodedImage;
use crate::model::frame::{BlendOp, DisposeOp, FrameDescriptor, InlinePixels};
use crate::timing::delay::DelayFraction;

/// [`ImageDecoder`] for PNG and APNG files, backed by the `png` crate.
///
/// Plain PNGs (no `acTL`) decode as still images. For animations, each `fcTL` becomes one
/// [`FrameDescriptor`] whose region pixels are expanded to straight-alpha RGBA8. A default image
/// that is not part of the animation is skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngDecoder;

impl PngDecoder {
    /// Create a decoder.
    pub fn new() -> Self {
        Self
    }

    /// Decode an in-memory PNG/APNG.
    pub fn decode_bytes(&self, bytes: &[u8]) -> ApngResult<DecodedImage> {
        decode_reader(Cursor::new(bytes))
    }
}

impl ImageDecoder for PngDecoder {
    #[tracing::instrument(skip(self, resource), fields(resource = %resource.describe()))]
    fn decode(&self, resource: &Resource) -> ApngResult<DecodedImage> {
        match resource {
            Resource::Empty => Err(ApngError::decode("no resource to decode")),
            Resource::Bytes(b) => self.decode_bytes(b),
            Resource::Path(p) => {
                let f = File::open(p)
                    .map_err(|e| ApngError::decode(format!("open '{}': {e}", p.display())))?;
                decode_reader(BufReader::new(f))
            }
        }
    }
}

const MAX_FRAME_RESERVE: usize = 1024;

fn decode_reader<R: Read>(r: R) -> ApngResult<DecodedImage> {
    let mut decoder = png::Decoder::new(r);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| ApngError::decode(format!("read png header: {e}")))?;

    let canvas = Canvas::new(reader.info().width, reader.info().height)?;
    let actl = reader.info().animation_control().cloned();
    let default_is_first_frame = reader.info().frame_control().is_some();
    let mut buf = vec![0u8; reader.output_buffer_size()];

    let Some(actl) = actl else {
        let out = reader
            .next_frame(&mut buf)
            .map_err(|e| ApngError::decode(format!("decode png image data: {e}")))?;
        let rgba = expand_to_rgba8(&buf[..out.buffer_size()], out.color_type)?;
        let frame = FrameDescriptor::new(
            0,
            canvas.full_region(),
            BlendOp::Source,
            DisposeOp::None,
            DelayFraction::default(),
            Arc::new(InlinePixels::new(rgba)),
        )?;
        tracing::debug!(width = canvas.width, height = canvas.height, "decoded still png");
        return DecodedImage::still(canvas, frame);
    };

    if !default_is_first_frame {
        reader
            .next_frame(&mut buf)
            .map_err(|e| ApngError::decode(format!("skip default image: {e}")))?;
    }

    // acTL is untrusted: reserve a bounded amount and let missing frame data end the loop.
    let mut frames = Vec::with_capacity((actl.num_frames as usize).min(MAX_FRAME_RESERVE));
    for i in 0..actl.num_frames {
        let out = reader
            .next_frame(&mut buf)
            .map_err(|e| ApngError::decode(format!("decode frame {i}: {e}")))?;
        let fc = reader
            .info()
            .frame_control()
            .cloned()
            .ok_or_else(|| ApngError::decode(format!("frame {i} has no fcTL chunk")))?;
        if (fc.width, fc.height) != (out.width, out.height) {
            return Err(ApngError::malformed_frame(format!(
                "frame {i} fcTL size {}x{} does not match its data {}x{}",
                fc.width, fc.height, out.width, out.height
            )));
        }
        let rgba = expand_to_rgba8(&buf[..out.buffer_size()], out.color_type)?;
        frames.push(FrameDescriptor::new(
            i,
            Region {
                x: fc.x_offset,
                y: fc.y_offset,
                width: fc.width,
                height: fc.height,
            },
            match fc.blend_op {
                png::BlendOp::Source => BlendOp::Source,
                png::BlendOp::Over => BlendOp::Over,
            },
            match fc.dispose_op {
                png::DisposeOp::None => DisposeOp::None,
                png::DisposeOp::Background => DisposeOp::Background,
                png::DisposeOp::Previous => DisposeOp::Previous,
            },
            DelayFraction::new(fc.delay_num, fc.delay_den),
            Arc::new(InlinePixels::new(rgba)),
        )?);
    }

    tracing::debug!(
        width = canvas.width,
        height = canvas.height,
        frames = frames.len(),
        num_plays = actl.num_plays,
        "decoded apng"
    );
    DecodedImage::animated(canvas, frames, actl.num_plays)
}

/// Normalize 8-bit decoder output to straight-alpha RGBA8.
fn expand_to_rgba8(buf: &[u8], color: png::ColorType) -> ApngResult<Vec<u8>> {
    let out = match color {
        png::ColorType::Rgba => buf.to_vec(),
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::Indexed => {
            return Err(ApngError::decode(
                "indexed color survived palette expansion",
            ));
        }
    };
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/apng.rs"]
mod tests;
