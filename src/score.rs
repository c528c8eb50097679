// Composite pressure score: weighted sum of stepwise 25/50/75/90 band contributions.

use std::collections::BTreeMap;

use crate::models::MetricValues;
use crate::thresholds::{Direction, ThresholdTable};

/// Band floors (percent) and the fraction of a metric's weight each one unlocks.
const BANDS: [(f64, f64); 4] = [(90.0, 1.0), (75.0, 0.75), (50.0, 0.5), (25.0, 0.25)];

/// Fraction of the weight earned by a percentage value.
pub fn band_fraction(percent: f64) -> f64 {
    BANDS
        .iter()
        .find(|(floor, _)| percent >= *floor)
        .map(|(_, fraction)| *fraction)
        .unwrap_or(0.0)
}

/// Σ weight × band fraction over the weighted metrics present in `values`.
/// Metrics whose threshold direction is `below` are scored on `100 - value`.
pub fn composite_score(
    values: &MetricValues,
    weights: &BTreeMap<String, f64>,
    thresholds: &ThresholdTable,
) -> f64 {
    weights
        .iter()
        .filter_map(|(metric, weight)| {
            let value = values.get(metric)?;
            let pressure = match thresholds.get(metric).map(|t| t.direction) {
                Some(Direction::Below) => 100.0 - value,
                _ => *value,
            };
            Some(weight * band_fraction(pressure))
        })
        .sum()
}
