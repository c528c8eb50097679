// Shared test helpers
#![allow(dead_code)]

use std::collections::BTreeMap;

use tierstat::config::EngineConfig;
use tierstat::engine::Engine;
use tierstat::models::{MetricValues, Sample};
use tierstat::thresholds::Threshold;

/// 2023-11-14T22:15:00Z, aligned to 1-, 5- and 15-minute boundaries.
pub const T0: f64 = 1_700_000_100.0;

pub fn values(pairs: &[(&str, f64)]) -> MetricValues {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn sample(epoch: f64, pairs: &[(&str, f64)]) -> Sample {
    Sample::new(epoch, values(pairs), 0.0)
}

/// Defaults (10 s sampling, 60/60/288/672 tiers) with cpu/memory thresholds and weights.
pub fn test_config(snapshot_path: &str) -> EngineConfig {
    let mut config = EngineConfig::with_snapshot_path(snapshot_path);
    config.thresholds = BTreeMap::from([
        ("cpu".to_string(), Threshold::above(75.0, 90.0)),
        ("memory".to_string(), Threshold::above(80.0, 90.0)),
    ]);
    config.score_weights =
        BTreeMap::from([("cpu".to_string(), 50.0), ("memory".to_string(), 50.0)]);
    config
}

/// Feeds `count` samples every `step` seconds from `start`, cpu taken from `cpu_at(i)`.
pub fn feed(engine: &Engine, start: f64, step: f64, count: usize, cpu_at: impl Fn(usize) -> f64) {
    for i in 0..count {
        let epoch = start + step * i as f64;
        engine.record_values(epoch, values(&[("cpu", cpu_at(i)), ("memory", 40.0)]));
    }
}
