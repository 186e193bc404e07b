//! Capacity threshold filter.

use crate::model::{CollectionSet, FillLevel, Reading};

/// Collect the bins whose level is at or above `threshold`.
///
/// A reading exactly on the threshold is flagged. The filter is stateless, so
/// a bin hovering around the threshold can enter and leave the set between
/// cycles.
#[must_use]
pub fn collection_set(readings: &[Reading], threshold: FillLevel) -> CollectionSet {
    readings
        .iter()
        .filter(|reading| reading.level >= threshold)
        .map(|reading| (reading.bin, reading.level))
        .collect()
}
