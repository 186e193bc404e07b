//! Simulated backend: bins that fill up between polls and an optimizer that
//! visits the fullest bins first and empties them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use binwatch_core::{
    model::{BinId, FillLevel, Route, RouteRequest},
    plugin::BackendPlugin,
    ports::{PortError, RoutePort, TelemetryPort},
};

/// Identifier under which this backend registers.
pub const BACKEND_ID: &str = "simulated";

/// Largest amount a bin fills between two polls.
const DEFAULT_MAX_STEP: f64 = 0.3;

struct SimState {
    levels: HashMap<BinId, f64>,
    rng: StdRng,
}

/// Fill levels of the simulated bins, shared by both ports.
pub struct SimulatedBins {
    state: Mutex<SimState>,
    max_step: f64,
}

impl SimulatedBins {
    /// Bins starting empty, filling randomly from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy(), DEFAULT_MAX_STEP)
    }

    /// Reproducible bins for a given seed.
    #[must_use]
    pub fn seeded(seed: u64, max_step: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), max_step)
    }

    fn with_rng(rng: StdRng, max_step: f64) -> Self {
        Self {
            state: Mutex::new(SimState {
                levels: HashMap::new(),
                rng,
            }),
            max_step: max_step.clamp(0.0, 1.0),
        }
    }

    /// Set a bin's level directly; values are clamped into `[0, 1]`.
    pub fn set_level(&self, bin: BinId, level: f64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.levels.insert(bin, level.clamp(0.0, 1.0));
    }

    /// Current level without filling the bin.
    #[must_use]
    pub fn level(&self, bin: BinId) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.levels.get(&bin).copied().unwrap_or(0.0)
    }

    fn fill(&self, bin: BinId) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let step = if self.max_step > 0.0 {
            state.rng.gen_range(0.0..=self.max_step)
        } else {
            0.0
        };
        let level = state.levels.entry(bin).or_insert(0.0);
        *level = (*level + step).min(1.0);
        *level
    }

    fn collect(&self, bins: &[BinId]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for bin in bins {
            state.levels.insert(*bin, 0.0);
        }
    }
}

impl Default for SimulatedBins {
    fn default() -> Self {
        Self::new()
    }
}

/// Telemetry port reading the simulated bins.
pub struct SimulatedTelemetryPort {
    bins: Arc<SimulatedBins>,
}

impl SimulatedTelemetryPort {
    /// Create a telemetry port over `bins`.
    #[must_use]
    pub fn new(bins: Arc<SimulatedBins>) -> Self {
        Self { bins }
    }
}

#[async_trait]
impl TelemetryPort for SimulatedTelemetryPort {
    async fn fill_level(&self, bin: BinId) -> Result<FillLevel, PortError> {
        let value = self.bins.fill(bin);
        FillLevel::new(value).ok_or(PortError::InvalidReading(value))
    }
}

/// Optimizer ordering bins fullest-first, then emptying them.
pub struct FullestFirstOptimizer {
    bins: Arc<SimulatedBins>,
}

impl FullestFirstOptimizer {
    /// Create an optimizer over `bins`.
    #[must_use]
    pub fn new(bins: Arc<SimulatedBins>) -> Self {
        Self { bins }
    }
}

#[async_trait]
impl RoutePort for FullestFirstOptimizer {
    async fn optimize(&self, request: &RouteRequest) -> Result<Route, PortError> {
        let mut stops: Vec<(BinId, f64)> = request
            .bins
            .iter()
            .map(|bin| (*bin, self.bins.level(*bin)))
            .collect();
        stops.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));

        let route: Vec<BinId> = stops.into_iter().map(|(bin, _)| bin).collect();
        self.bins.collect(&route);
        debug!(origin = %request.current_location, stops = route.len(), "simulated route planned");

        Ok(Route(route))
    }
}

/// Build the plugin bundle for the simulated backend.
#[must_use]
pub fn plugin(bins: Arc<SimulatedBins>) -> BackendPlugin {
    BackendPlugin {
        id: BACKEND_ID.to_owned(),
        telemetry_port: Arc::new(SimulatedTelemetryPort::new(Arc::clone(&bins))),
        route_port: Arc::new(FullestFirstOptimizer::new(bins)),
    }
}
