//! Domain data structures for bins, readings, flagged sets and routes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier of a monitored bin.
pub struct BinId(pub u32);

impl fmt::Display for BinId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
/// How full a bin is, as a fraction in the closed interval `[0, 1]`.
pub struct FillLevel(f64);

impl FillLevel {
    /// Completely empty bin.
    pub const EMPTY: Self = Self(0.0);
    /// Completely full bin.
    pub const FULL: Self = Self(1.0);

    /// Wrap a raw fraction, rejecting NaN and anything outside `[0, 1]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        (0.0..=1.0).contains(&value).then_some(Self(value))
    }

    /// Raw fraction.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for FillLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.2}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Where a reading came from.
pub enum ReadingSource {
    /// Reported by the telemetry backend.
    Sensor,
    /// Substituted by the unknown-reading policy after a failed query.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Fill level observed for one bin during one cycle.
pub struct Reading {
    /// Bin the reading belongs to.
    pub bin: BinId,
    /// Observed (or substituted) level.
    pub level: FillLevel,
    /// Origin of the level.
    pub source: ReadingSource,
}

impl Reading {
    /// Reading reported by a sensor.
    #[must_use]
    pub fn sensor(bin: BinId, level: FillLevel) -> Self {
        Self {
            bin,
            level,
            source: ReadingSource::Sensor,
        }
    }

    /// Reading synthesized after a failed query.
    #[must_use]
    pub fn fallback(bin: BinId, level: FillLevel) -> Self {
        Self {
            bin,
            level,
            source: ReadingSource::Fallback,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Bins that need collection in the current cycle, keyed by id.
///
/// Iteration is in ascending id order.
pub struct CollectionSet(BTreeMap<BinId, FillLevel>);

impl CollectionSet {
    /// Level recorded for a bin, if it is flagged.
    #[must_use]
    pub fn get(&self, bin: BinId) -> Option<FillLevel> {
        self.0.get(&bin).copied()
    }

    /// Whether no bin was flagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of flagged bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Flagged bin ids in ascending order.
    #[must_use]
    pub fn bins(&self) -> Vec<BinId> {
        self.0.keys().copied().collect()
    }

    /// Iterate over `(bin, level)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (BinId, FillLevel)> + '_ {
        self.0.iter().map(|(bin, level)| (*bin, *level))
    }
}

impl FromIterator<(BinId, FillLevel)> for CollectionSet {
    fn from_iter<I: IntoIterator<Item = (BinId, FillLevel)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for CollectionSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("{")?;
        for (idx, (bin, level)) in self.iter().enumerate() {
            if idx > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{bin}: {level}")?;
        }
        formatter.write_str("}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Visiting order produced by the route optimizer.
pub struct Route(pub Vec<BinId>);

impl Route {
    /// Whether the optimizer returned no stops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("[")?;
        for (idx, bin) in self.0.iter().enumerate() {
            if idx > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{bin}")?;
        }
        formatter.write_str("]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Payload submitted to the route optimizer.
pub struct RouteRequest {
    /// Flagged bins, ascending by id.
    pub bins: Vec<BinId>,
    /// Label of the depot the collection vehicle starts from.
    pub current_location: String,
}

impl RouteRequest {
    /// Build a request for every bin in the flagged set.
    #[must_use]
    pub fn new(set: &CollectionSet, origin: &str) -> Self {
        Self {
            bins: set.bins(),
            current_location: origin.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// What happened to the route request of a cycle.
pub enum RouteOutcome {
    /// Nothing was flagged, so no request was made.
    NotRequested,
    /// The optimizer answered with a route.
    Planned(Route),
    /// The optimizer was unreachable or refused the request.
    Unavailable,
}

impl RouteOutcome {
    /// Route to report; empty unless the optimizer answered.
    #[must_use]
    pub fn route(&self) -> Route {
        match self {
            RouteOutcome::Planned(route) => route.clone(),
            RouteOutcome::NotRequested | RouteOutcome::Unavailable => Route::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Everything observed during one polling cycle.
pub struct CycleReport {
    /// When the cycle began.
    pub started_at: DateTime<Utc>,
    /// One reading per configured bin, in configured order.
    pub readings: Vec<Reading>,
    /// Bins at or above the capacity threshold.
    pub flagged: CollectionSet,
    /// Result of the route request.
    pub route: RouteOutcome,
}
