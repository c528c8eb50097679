// Threshold-crossing events (spikes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MetricValues;

/// Severity of a threshold crossing; serializes lowercase ("warning", "critical").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// One metric crossing one threshold at one instant. `context` holds every other
/// metric value of the same sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub epoch: f64,
    pub metric: String,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
    pub context: MetricValues,
}
