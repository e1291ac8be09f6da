use rand::Rng;

use crate::error::ConfigError;

/// Per-minute reward bounds, guaranteed `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBounds {
    min: u32,
    max: u32,
}

impl ScoreBounds {
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidScoreBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    fn range(&self) -> u32 {
        self.max - self.min
    }
}

/// Sum of one independent draw in `[min, max]` for every whole minute spent.
///
/// Drawing per minute rather than scaling a single draw means the spread of
/// the total grows with the session length.
pub fn score<R: Rng + ?Sized>(minutes: u64, bounds: ScoreBounds, rng: &mut R) -> u64 {
    (0..minutes)
        .map(|_| u64::from(bounds.min) + u64::from(rng.gen_range(0..=bounds.range())))
        .sum()
}
