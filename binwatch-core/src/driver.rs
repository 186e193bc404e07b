//! Driver loop: runs the tracker cycle on a fixed interval until shutdown.
//!
//! The first cycle starts immediately. Shutdown is observed both while a
//! cycle is in flight and while waiting for the next one, so an in-progress
//! backend request is dropped rather than waited out.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::model::CycleReport;
use crate::service::TrackerService;

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    /// Cycles that ran to completion, successful or not.
    pub cycles: u64,
    /// Cycles that ended with an error.
    pub failed: u64,
}

/// Periodic scheduler around a [`TrackerService`].
pub struct Driver {
    service: TrackerService,
    interval: Duration,
}

impl Driver {
    /// Create a driver running `service` every `interval`.
    #[must_use]
    pub fn new(service: TrackerService, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run a single cycle, logging and swallowing any error.
    pub async fn run_once(&mut self) -> Option<CycleReport> {
        match self.service.run_cycle().await {
            Ok(report) => Some(report),
            Err(err) => {
                error!(error = %err, kind = err.kind(), "cycle failed");
                None
            }
        }
    }

    /// Run cycles until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> DriverSummary {
        let mut summary = DriverSummary::default();
        info!(interval_secs = self.interval.as_secs(), bins = self.service.bins().len(), "driver started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                report = self.service.run_cycle() => {
                    summary.cycles += 1;
                    if let Err(err) = report {
                        summary.failed += 1;
                        error!(error = %err, kind = err.kind(), "cycle failed");
                    }
                }
                _ = shutdown.wait_for(|stop| *stop) => {
                    debug!("shutdown requested during cycle");
                    break;
                }
            }

            info!(next_in_secs = self.interval.as_secs(), "waiting for the next run");

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = shutdown.wait_for(|stop| *stop) => {
                    debug!("shutdown requested while waiting");
                    break;
                }
            }
        }

        info!(cycles = summary.cycles, failed = summary.failed, "driver stopped");
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;
    use crate::model::{BinId, FillLevel};
    use crate::ports::{PortError, TelemetryPort};
    use crate::testing::{Optimizer, RecordingRouter, ScriptedTelemetry, Sensor, config};

    const HOUR: Duration = Duration::from_secs(3600);

    /// Telemetry that never answers.
    struct Hung;

    #[async_trait]
    impl TelemetryPort for Hung {
        async fn fill_level(&self, _bin: BinId) -> Result<FillLevel, PortError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_once_per_interval() {
        let telemetry = Arc::new(ScriptedTelemetry::new(&[(1, Sensor::Level(0.1)), (2, Sensor::Level(0.2))]));
        let router = Arc::new(RecordingRouter::new(Optimizer::Answer(Vec::new())));
        let service = TrackerService::from_ports(&config(&[1, 2]), telemetry.clone(), router.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(Driver::new(service, HOUR).run(shutdown_rx));

        tokio::time::sleep(HOUR * 2 + Duration::from_secs(1)).await;
        shutdown_tx.send(true).expect("driver is listening");
        let summary = handle.await.expect("driver task");

        assert_eq!(summary, DriverSummary { cycles: 3, failed: 0 });
        assert_eq!(telemetry.calls.load(Ordering::SeqCst), 6);
        assert_eq!(router.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_errors_do_not_stop_the_loop() {
        let telemetry = Arc::new(ScriptedTelemetry::new(&[(1, Sensor::Level(0.9))]));
        let router = Arc::new(RecordingRouter::new(Optimizer::Garbage));
        let service = TrackerService::from_ports(&config(&[1]), telemetry, router.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(Driver::new(service, HOUR).run(shutdown_rx));

        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        shutdown_tx.send(true).expect("driver is listening");
        let summary = handle.await.expect("driver task");

        assert_eq!(summary, DriverSummary { cycles: 2, failed: 2 });
        assert_eq!(router.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_start_runs_nothing() {
        let telemetry = Arc::new(ScriptedTelemetry::new(&[(1, Sensor::Level(0.9))]));
        let router = Arc::new(RecordingRouter::new(Optimizer::Answer(vec![1])));
        let service = TrackerService::from_ports(&config(&[1]), telemetry.clone(), router);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).expect("receiver alive");

        let summary = Driver::new(service, HOUR).run(shutdown_rx).await;

        assert_eq!(summary, DriverSummary::default());
        assert_eq!(telemetry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_a_hung_cycle() {
        let router = Arc::new(RecordingRouter::new(Optimizer::Answer(Vec::new())));
        let service = TrackerService::from_ports(&config(&[1]), Arc::new(Hung), router);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(Driver::new(service, HOUR).run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown_tx.send(true).expect("driver is listening");
        let summary = handle.await.expect("driver task");

        assert_eq!(summary.cycles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_stops_the_loop() {
        let telemetry = Arc::new(ScriptedTelemetry::new(&[(1, Sensor::Level(0.1))]));
        let router = Arc::new(RecordingRouter::new(Optimizer::Answer(Vec::new())));
        let service = TrackerService::from_ports(&config(&[1]), telemetry, router);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(Driver::new(service, HOUR).run(shutdown_rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(shutdown_tx);

        let summary = handle.await.expect("driver task");
        assert_eq!(summary.cycles, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sending_false_keeps_the_loop_running() {
        let telemetry = Arc::new(ScriptedTelemetry::new(&[(1, Sensor::Level(0.1))]));
        let router = Arc::new(RecordingRouter::new(Optimizer::Answer(Vec::new())));
        let service = TrackerService::from_ports(&config(&[1]), telemetry.clone(), router);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(Driver::new(service, HOUR).run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(false).expect("driver is listening");
        tokio::time::sleep(HOUR * 3).await;
        assert!(!handle.is_finished(), "a false value must not stop the driver");

        shutdown_tx.send(true).expect("driver is listening");
        let summary = handle.await.expect("driver task");

        assert_eq!(summary, DriverSummary { cycles: 4, failed: 0 });
        assert_eq!(telemetry.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn run_once_swallows_errors() {
        let telemetry = Arc::new(ScriptedTelemetry::new(&[(1, Sensor::Level(0.9))]));
        let router = Arc::new(RecordingRouter::new(Optimizer::Garbage));
        let service = TrackerService::from_ports(&config(&[1]), telemetry, router);

        assert!(Driver::new(service, HOUR).run_once().await.is_none(), "error must be swallowed");
    }
}
