//! Upstream decoding: resource references and the PNG/APNG adapter.

pub(crate) mod decoder;
pub(crate) mod apng;
