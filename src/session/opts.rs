use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::foundation::error::{ApngError, ApngResult};
use crate::playback::scheduler::{EndBehavior, ScheduleOpts};
use crate::timing::delay::SpeedRatio;

/// Options recognized by [`crate::Player`].
///
/// Deserializable from JSON; missing fields take their defaults and `speed_ratio` is normalized
/// on the way in (`<= 0` becomes `1.0`).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerOpts {
    /// Loop back to frame 0 after the last frame.
    pub repeat: bool,
    /// What to do at the end of a non-repeating sequence.
    pub end_behavior: EndBehavior,
    /// Playback speed multiplier.
    pub speed_ratio: SpeedRatio,
    /// Directory used to resolve relative locators during decode fallback.
    pub base_dir: Option<PathBuf>,
}

impl PlayerOpts {
    /// Parse options from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ApngResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ApngError::validation(format!("parse player options JSON: {e}")))
    }

    /// Parse options from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ApngResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ApngError::validation(format!("open player options '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Set the speed ratio, normalizing invalid values to `1.0`.
    pub fn with_speed_ratio(mut self, ratio: f64) -> Self {
        self.speed_ratio = SpeedRatio::new(ratio);
        self
    }

    pub(crate) fn schedule(&self) -> ScheduleOpts {
        ScheduleOpts {
            repeat: self.repeat,
            end_behavior: self.end_behavior,
            speed_ratio: self.speed_ratio,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/opts.rs"]
mod tests;
