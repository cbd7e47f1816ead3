//! Parsed APNG frame model consumed by the compositor.

pub(crate) mod frame;
pub(crate) mod decoded;
