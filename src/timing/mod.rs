//! Frame delay normalization.

pub(crate) mod delay;
