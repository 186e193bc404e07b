//! One polling cycle: read every bin, flag the full ones, request a route.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::alarm::FailureTracker;
use crate::config::TrackerConfig;
use crate::fallback::UnknownReadingPolicy;
use crate::filter::collection_set;
use crate::model::{
    BinId, CollectionSet, CycleReport, FillLevel, Reading, RouteOutcome, RouteRequest,
};
use crate::plugin::BackendPlugin;
use crate::ports::{PortError, RoutePort, TelemetryPort};

/// Public entry point composing the sensor reader, threshold filter and route
/// requester.
pub struct TrackerService {
    bins: Vec<BinId>,
    threshold: FillLevel,
    origin: String,
    telemetry: Arc<dyn TelemetryPort>,
    router: Arc<dyn RoutePort>,
    fallback: Arc<dyn UnknownReadingPolicy>,
    failures: FailureTracker,
}

impl TrackerService {
    /// Create a service for the configured bins backed by `plugin`.
    #[must_use]
    pub fn new(config: &TrackerConfig, plugin: &BackendPlugin) -> Self {
        Self::from_ports(
            config,
            Arc::clone(&plugin.telemetry_port),
            Arc::clone(&plugin.route_port),
        )
    }

    /// Create a service from individual ports, using the configured fallback.
    #[must_use]
    pub fn from_ports(
        config: &TrackerConfig,
        telemetry: Arc<dyn TelemetryPort>,
        router: Arc<dyn RoutePort>,
    ) -> Self {
        Self {
            bins: config.bin_ids(),
            threshold: config.threshold(),
            origin: config.origin.clone(),
            telemetry,
            router,
            fallback: config.fallback_policy(),
            failures: FailureTracker::new(config.alarm_after),
        }
    }

    /// Replace the unknown-reading policy.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn UnknownReadingPolicy>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Bins polled each cycle, in order.
    #[must_use]
    pub fn bins(&self) -> &[BinId] {
        &self.bins
    }

    /// Per-bin telemetry failure counters.
    #[must_use]
    pub fn failures(&self) -> &FailureTracker {
        &self.failures
    }

    /// Poll every configured bin once, one after the other.
    ///
    /// A bin that cannot be read gets a substitute level from the
    /// unknown-reading policy; the remaining bins are still polled.
    pub async fn read_levels(&mut self) -> Vec<Reading> {
        let mut readings = Vec::with_capacity(self.bins.len());

        for &bin in &self.bins {
            let reading = match self.telemetry.fill_level(bin).await {
                Ok(level) => {
                    self.failures.record_success(bin);
                    Reading::sensor(bin, level)
                }
                Err(err) => {
                    warn!(%bin, error = %err, kind = err.kind(), "telemetry query failed, using fallback");
                    self.failures.record_failure(bin, &err);
                    Reading::fallback(bin, self.fallback.substitute(bin, &err))
                }
            };
            info!(bin = %reading.bin, level = %reading.level, source = ?reading.source, "bin waste level");
            readings.push(reading);
        }

        readings
    }

    /// Bins at or above the configured threshold.
    #[must_use]
    pub fn flag(&self, readings: &[Reading]) -> CollectionSet {
        collection_set(readings, self.threshold)
    }

    /// Ask the optimizer for a route through the flagged bins.
    ///
    /// An empty set is answered without contacting the optimizer. Transport
    /// failures and error statuses degrade to [`RouteOutcome::Unavailable`].
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the optimizer answers successfully with a
    /// body that cannot be used.
    pub async fn request_route(&self, set: &CollectionSet) -> Result<RouteOutcome, PortError> {
        if set.is_empty() {
            info!("no bins need collection at the moment");
            return Ok(RouteOutcome::NotRequested);
        }

        let request = RouteRequest::new(set, &self.origin);
        debug!(bins = ?request.bins, origin = %request.current_location, "requesting route");

        match self.router.optimize(&request).await {
            Ok(route) => {
                info!(%route, "optimized route");
                Ok(RouteOutcome::Planned(route))
            }
            Err(err) if err.is_unreachable() => {
                warn!(error = %err, kind = err.kind(), "route optimizer unavailable");
                Ok(RouteOutcome::Unavailable)
            }
            Err(err) => Err(err),
        }
    }

    /// Run the three stages once.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] for failures that are not degraded at the call
    /// site, such as an undecodable optimizer answer.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, PortError> {
        let started_at = Utc::now();
        info!(at = %started_at, "running waste tracker cycle");

        let readings = self.read_levels().await;
        let flagged = self.flag(&readings);
        if !flagged.is_empty() {
            info!(count = flagged.len(), bins = %flagged, "bins need collection");
        }
        let route = self.request_route(&flagged).await?;
        info!(route = %route.route(), flagged = flagged.len(), "cycle finished");

        Ok(CycleReport {
            started_at,
            readings,
            flagged,
            route,
        })
    }
}
