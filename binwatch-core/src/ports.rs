//! Traits describing the external backends and their shared error type.

use async_trait::async_trait;
use reqwest::{Error as ReqwestError, StatusCode};

use crate::model::{BinId, FillLevel, Route, RouteRequest};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the telemetry or optimizer backends.
pub enum PortError {
    /// Network layer failed (connect, timeout, reset).
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Backend answered with a non-success status.
    #[error("Backend returned status {0}")]
    Status(StatusCode),
    /// Response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),
    /// Telemetry reported a level outside `[0, 1]`.
    #[error("Fill level {0} is outside [0, 1]")]
    InvalidReading(f64),
    /// No plugin is registered under the configured backend id.
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),
}

impl PortError {
    /// Whether the failure is a connectivity or status problem, as opposed to a
    /// backend that answered with something we could not use.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, PortError::Network(_) | PortError::Status(_))
    }

    /// Short machine-friendly label used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PortError::Network(err) if err.is_timeout() => "timeout",
            PortError::Network(_) => "network",
            PortError::Status(_) => "status",
            PortError::Decode(_) => "decode",
            PortError::InvalidReading(_) => "invalid_reading",
            PortError::UnsupportedBackend(_) => "unsupported_backend",
        }
    }
}

#[async_trait]
/// Trait for backends that report bin fill levels.
pub trait TelemetryPort: Send + Sync {
    /// Query the current fill level of a single bin.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend cannot be reached, rejects the
    /// request, or reports an unusable level.
    async fn fill_level(&self, bin: BinId) -> Result<FillLevel, PortError>;
}

#[async_trait]
/// Trait for backends that order a set of bins into a collection route.
pub trait RoutePort: Send + Sync {
    /// Ask the optimizer for a visiting order.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the optimizer cannot be reached, rejects
    /// the request, or answers with a body that cannot be decoded.
    async fn optimize(&self, request: &RouteRequest) -> Result<Route, PortError>;
}
