//! In-memory port fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::{FallbackConfig, TrackerConfig};
use crate::model::{BinId, FillLevel, Route, RouteRequest};
use crate::ports::{PortError, RoutePort, TelemetryPort};

/// Canned telemetry behavior for one bin.
#[derive(Clone, Copy)]
pub(crate) enum Sensor {
    Level(f64),
    Down,
    Garbage,
}

pub(crate) struct ScriptedTelemetry {
    sensors: HashMap<BinId, Sensor>,
    pub(crate) calls: AtomicUsize,
}

impl ScriptedTelemetry {
    pub(crate) fn new(sensors: &[(u32, Sensor)]) -> Self {
        Self {
            sensors: sensors.iter().map(|(bin, sensor)| (BinId(*bin), *sensor)).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TelemetryPort for ScriptedTelemetry {
    async fn fill_level(&self, bin: BinId) -> Result<FillLevel, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.sensors.get(&bin).copied().unwrap_or(Sensor::Down) {
            Sensor::Level(value) => FillLevel::new(value).ok_or(PortError::InvalidReading(value)),
            Sensor::Down => Err(PortError::Status(StatusCode::SERVICE_UNAVAILABLE)),
            Sensor::Garbage => Err(PortError::Decode("expected a number".into())),
        }
    }
}

/// Canned optimizer behavior.
#[derive(Clone)]
pub(crate) enum Optimizer {
    Answer(Vec<u32>),
    Refuse,
    Garbage,
}

pub(crate) struct RecordingRouter {
    answer: Optimizer,
    pub(crate) requests: Mutex<Vec<RouteRequest>>,
}

impl RecordingRouter {
    pub(crate) fn new(answer: Optimizer) -> Self {
        Self {
            answer,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl RoutePort for RecordingRouter {
    async fn optimize(&self, request: &RouteRequest) -> Result<Route, PortError> {
        self.requests.lock().expect("requests lock").push(request.clone());
        match &self.answer {
            Optimizer::Answer(ids) => Ok(Route(ids.iter().copied().map(BinId).collect())),
            Optimizer::Refuse => Err(PortError::Status(StatusCode::INTERNAL_SERVER_ERROR)),
            Optimizer::Garbage => Err(PortError::Decode("route is not a list".into())),
        }
    }
}

pub(crate) fn config(bins: &[u32]) -> TrackerConfig {
    TrackerConfig {
        bins: bins.to_vec(),
        threshold: 0.8,
        fallback: FallbackConfig::Fixed { level: 0.0 },
        ..TrackerConfig::default()
    }
}
