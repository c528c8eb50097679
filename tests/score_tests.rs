// Composite pressure score

mod common;

use std::collections::BTreeMap;

use common::values;
use tierstat::config::{default_pressure_thresholds, default_pressure_weights};
use tierstat::score::{band_fraction, composite_score};
use tierstat::thresholds::Threshold;

#[test]
fn band_edges() {
    assert_eq!(band_fraction(0.0), 0.0);
    assert_eq!(band_fraction(24.99), 0.0);
    assert_eq!(band_fraction(25.0), 0.25);
    assert_eq!(band_fraction(49.99), 0.25);
    assert_eq!(band_fraction(50.0), 0.5);
    assert_eq!(band_fraction(75.0), 0.75);
    assert_eq!(band_fraction(89.99), 0.75);
    assert_eq!(band_fraction(90.0), 1.0);
    assert_eq!(band_fraction(100.0), 1.0);
}

#[test]
fn weighted_sum_over_default_pressure_weights() {
    let v = values(&[("cpu", 95.0), ("memory", 60.0), ("swap", 10.0)]);
    let score = composite_score(&v, &default_pressure_weights(), &default_pressure_thresholds());
    // 40 × 1.0 + 40 × 0.5 + 20 × 0
    assert_eq!(score, 60.0);
}

#[test]
fn full_pressure_scores_one_hundred_and_idle_scores_zero() {
    let weights = default_pressure_weights();
    let thresholds = default_pressure_thresholds();
    let busy = values(&[("cpu", 100.0), ("memory", 95.0), ("swap", 90.0)]);
    assert_eq!(composite_score(&busy, &weights, &thresholds), 100.0);
    let idle = values(&[("cpu", 1.0), ("memory", 10.0), ("swap", 0.0)]);
    assert_eq!(composite_score(&idle, &weights, &thresholds), 0.0);
}

#[test]
fn missing_and_unweighted_metrics_contribute_nothing() {
    let weights = BTreeMap::from([("cpu".to_string(), 40.0)]);
    let v = values(&[("memory", 99.0), ("load_1m", 12.0)]);
    assert_eq!(composite_score(&v, &weights, &BTreeMap::new()), 0.0);
}

#[test]
fn below_direction_scores_the_complement() {
    let weights = BTreeMap::from([("link_quality".to_string(), 100.0)]);
    let thresholds = BTreeMap::from([("link_quality".to_string(), Threshold::below(50.0, 30.0))]);
    // Poor link (5 %) is high pressure.
    let poor = values(&[("link_quality", 5.0)]);
    assert_eq!(composite_score(&poor, &weights, &thresholds), 100.0);
    let good = values(&[("link_quality", 90.0)]);
    assert_eq!(composite_score(&good, &weights, &thresholds), 0.0);
}
