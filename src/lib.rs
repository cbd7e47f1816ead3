//! APNG frame compositing and playback timing.
//!
//! A decoded image ([`DecodedImage`]) is folded frame by frame into a straight-alpha RGBA8
//! canvas by the [`Compositor`], cached write-once in a [`FrameCache`], and paced by a
//! [`Scheduler`] that emits [`PlaybackEvent`]s to a [`PlaybackSink`]. The [`Player`] owns
//! the load/unload lifecycle and guarantees at most one live playback session.
#![forbid(unsafe_code)]

mod assets;
mod compose;
mod foundation;
mod model;
mod playback;
mod session;
mod timing;

pub use assets::apng::PngDecoder;
pub use assets::decoder::{ImageDecoder, Resource};
pub use compose::blend::{
    PremulRgba8, over, over_straight, premultiply_rgba8_in_place, unpremultiply_rgba8_in_place,
};
pub use compose::cache::FrameCache;
pub use compose::canvas::{CompositedFrame, Compositor, composite_all};
pub use compose::store::FrameStore;
pub use foundation::core::{Canvas, Region};
pub use foundation::error::{ApngError, ApngResult};
pub use model::decoded::DecodedImage;
pub use model::frame::{BlendOp, DisposeOp, FrameDescriptor, InlinePixels, PixelSource};
pub use playback::cancel::CancelToken;
pub use playback::scheduler::{
    EndBehavior, PlaybackOutcome, PlaybackState, ScheduleOpts, Scheduler,
};
pub use playback::sink::{InMemorySink, PlaybackEvent, PlaybackSink};
pub use session::opts::PlayerOpts;
pub use session::player::Player;
pub use timing::delay::{DEFAULT_DELAY_DEN, DelayFraction, SpeedRatio, frame_delay};
