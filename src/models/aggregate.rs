// Roll-up record: one closed wall-clock window of a lower tier.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    /// Summary of a single observation.
    pub fn point(value: f64) -> Self {
        Self {
            mean: value,
            min: value,
            max: value,
        }
    }
}

/// Mean/min/max per metric over a window of constituents.
///
/// `timestamp`/`epoch` are those of the last constituent. `boundary_epoch` is the
/// wall-clock boundary (Unix seconds, truncated to the tier's resolution) whose
/// crossing closed the window. `count` is the number of direct constituents;
/// `sample_count` the number of raw samples underneath them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub timestamp: DateTime<Utc>,
    pub epoch: f64,
    pub boundary_epoch: i64,
    pub count: usize,
    pub sample_count: usize,
    pub metrics: BTreeMap<String, MetricSummary>,
    pub score: MetricSummary,
}

impl AggregateRecord {
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }
}
