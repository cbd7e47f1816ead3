//! Player lifecycle: load, reload, unload and session supervision.

pub(crate) mod opts;
pub(crate) mod player;
