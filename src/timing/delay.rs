use std::time::Duration;

/// Denominator substituted when a frame control record stores `0` (hundredths of a second).
pub const DEFAULT_DELAY_DEN: u16 = 100;

/// A frame's display duration as `num/den` seconds, exactly as stored in the fcTL chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DelayFraction {
    /// Numerator.
    pub num: u16,
    /// Denominator; `0` means [`DEFAULT_DELAY_DEN`].
    pub den: u16,
}

impl DelayFraction {
    /// Create a delay fraction. No validation: every pair is normalizable.
    pub fn new(num: u16, den: u16) -> Self {
        Self { num, den }
    }

    /// Denominator after substituting the zero sentinel.
    pub fn effective_den(self) -> u16 {
        if self.den == 0 {
            DEFAULT_DELAY_DEN
        } else {
            self.den
        }
    }

    /// Normalized display duration at the given playback speed.
    pub fn to_duration(self, speed: SpeedRatio) -> Duration {
        frame_delay(self.num, self.den, speed.get())
    }
}

/// Playback speed multiplier. Always positive and finite.
///
/// Non-positive or non-finite inputs normalize to `1.0` at construction, so consumers never
/// re-check the value.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct SpeedRatio(f64);

impl SpeedRatio {
    /// Normal playback speed.
    pub const NORMAL: Self = Self(1.0);

    /// Create a speed ratio, normalizing invalid values to `1.0`.
    pub fn new(ratio: f64) -> Self {
        if ratio.is_finite() && ratio > 0.0 {
            Self(ratio)
        } else {
            Self::NORMAL
        }
    }

    /// The ratio as a float.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for SpeedRatio {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<f64> for SpeedRatio {
    fn from(v: f64) -> Self {
        Self::new(v)
    }
}

impl From<SpeedRatio> for f64 {
    fn from(v: SpeedRatio) -> Self {
        v.0
    }
}

/// Compute a frame's display duration in milliseconds resolution.
///
/// `num * (1000 / den) / speed`, with `den == 0` read as hundredths. Negative or non-finite
/// results (possible only through a raw `speed` argument) collapse to zero.
pub fn frame_delay(num: u16, den: u16, speed: f64) -> Duration {
    let den = if den == 0 { DEFAULT_DELAY_DEN } else { den };
    let ms = f64::from(num) * (1000.0 / f64::from(den)) / speed;
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_millis(ms.round() as u64)
}

#[cfg(test)]
#[path = "../../tests/unit/timing/delay.rs"]
mod tests;
