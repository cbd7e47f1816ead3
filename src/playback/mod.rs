//! Paced playback of composited frames.

pub(crate) mod cancel;
pub(crate) mod scheduler;
pub(crate) mod sink;
