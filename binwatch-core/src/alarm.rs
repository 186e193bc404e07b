//! Tracking of bins whose telemetry keeps failing.
//!
//! A failed query never changes what the cycle does (the unknown-reading
//! policy still fills in a level), but a bin that fails several cycles in a
//! row is probably a broken sensor rather than a hiccup, so it is raised once
//! as an alarm and cleared again on the next good reading.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::model::BinId;
use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Alarm transition produced by recording a query result.
pub enum AlarmChange {
    /// Nothing noteworthy happened.
    Unchanged,
    /// The bin just crossed the consecutive failure threshold.
    Raised,
    /// A previously alarmed bin reported successfully.
    Cleared,
}

/// Consecutive telemetry failure counters per bin.
#[derive(Debug)]
pub struct FailureTracker {
    alarm_after: u32,
    failures: HashMap<BinId, u32>,
}

impl FailureTracker {
    /// Create a tracker raising an alarm after `alarm_after` failures in a row.
    /// Zero disables alarms.
    #[must_use]
    pub fn new(alarm_after: u32) -> Self {
        Self {
            alarm_after,
            failures: HashMap::new(),
        }
    }

    /// Record a failed query for `bin`.
    pub fn record_failure(&mut self, bin: BinId, cause: &PortError) -> AlarmChange {
        let count = self.failures.entry(bin).or_insert(0);
        *count = count.saturating_add(1);

        if self.alarm_after > 0 && *count == self.alarm_after {
            warn!(
                %bin,
                failures = *count,
                kind = cause.kind(),
                unreachable = cause.is_unreachable(),
                "telemetry persistently failing"
            );
            AlarmChange::Raised
        } else {
            AlarmChange::Unchanged
        }
    }

    /// Record a successful query for `bin`.
    pub fn record_success(&mut self, bin: BinId) -> AlarmChange {
        match self.failures.remove(&bin) {
            Some(count) if self.alarm_after > 0 && count >= self.alarm_after => {
                info!(%bin, failures = count, "telemetry recovered");
                AlarmChange::Cleared
            }
            _ => AlarmChange::Unchanged,
        }
    }

    /// Current consecutive failure count for `bin`.
    #[must_use]
    pub fn consecutive_failures(&self, bin: BinId) -> u32 {
        self.failures.get(&bin).copied().unwrap_or(0)
    }

    /// Bins currently in alarm, ascending.
    #[must_use]
    pub fn alarmed(&self) -> Vec<BinId> {
        let mut bins: Vec<BinId> = self
            .failures
            .iter()
            .filter(|(_, count)| self.alarm_after > 0 && **count >= self.alarm_after)
            .map(|(bin, _)| *bin)
            .collect();
        bins.sort_unstable();
        bins
    }
}
