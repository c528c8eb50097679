// Raw samples as produced by a collector tick.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric name -> value. Ordered so JSON output and event context are stable.
pub type MetricValues = BTreeMap<String, f64>;

/// One raw snapshot: wall-clock time, epoch seconds, metric values and the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub epoch: f64,
    pub values: MetricValues,
    pub score: f64,
}

impl Sample {
    pub fn new(epoch: f64, values: MetricValues, score: f64) -> Self {
        Self {
            timestamp: timestamp_from_epoch(epoch),
            epoch,
            values,
            score,
        }
    }

    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }
}

/// Current wall-clock time as fractional Unix seconds.
pub fn epoch_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Millisecond-precision UTC timestamp for `epoch`; out-of-range values map to the Unix epoch.
pub fn timestamp_from_epoch(epoch: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis((epoch * 1000.0).round() as i64).unwrap_or_default()
}
