//! Canvas compositing and the composited-frame cache.

pub(crate) mod blend;
pub(crate) mod cache;
pub(crate) mod canvas;
pub(crate) mod store;
