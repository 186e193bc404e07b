//! Policies for substituting a level when a bin cannot be read.

use rand::Rng;

use crate::model::{BinId, FillLevel};
use crate::ports::PortError;

/// Decides which level stands in for a bin whose telemetry query failed.
pub trait UnknownReadingPolicy: Send + Sync {
    /// Produce a substitute level. Must always return a value in `[0, 1]`.
    fn substitute(&self, bin: BinId, cause: &PortError) -> FillLevel;
}

/// Uniformly random level, matching a sensor that reports noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReading;

impl UnknownReadingPolicy for RandomReading {
    fn substitute(&self, _bin: BinId, _cause: &PortError) -> FillLevel {
        let value = rand::thread_rng().gen_range(0.0..=1.0);
        FillLevel::new(value).unwrap_or(FillLevel::EMPTY)
    }
}

/// Constant level for every unknown bin.
#[derive(Debug, Clone, Copy)]
pub struct FixedReading(pub FillLevel);

impl UnknownReadingPolicy for FixedReading {
    fn substitute(&self, _bin: BinId, _cause: &PortError) -> FillLevel {
        self.0
    }
}
