// Tier selector and query response shapes (history + current).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AggregateRecord, Event, MetricSummary, Sample};
use crate::thresholds::Threshold;

/// The four resolutions, finest first. Also the `period` accepted by history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Finest,
    Hourly,
    Daily,
    Weekly,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Finest, Tier::Hourly, Tier::Daily, Tier::Weekly];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Finest => "finest",
            Tier::Hourly => "hourly",
            Tier::Daily => "daily",
            Tier::Weekly => "weekly",
        }
    }

    /// Parse a query `period`. Accepts tier names and the window shorthands
    /// ("10m", "1h", "24h", "7d"); `None` for anything else.
    pub fn from_period(period: &str) -> Option<Self> {
        match period.trim().to_ascii_lowercase().as_str() {
            "finest" | "fine" | "recent" | "10m" => Some(Tier::Finest),
            "hourly" | "hour" | "1h" => Some(Tier::Hourly),
            "daily" | "day" | "24h" => Some(Tier::Daily),
            "weekly" | "week" | "7d" => Some(Tier::Weekly),
            _ => None,
        }
    }

    /// Coarse tiers are served and restored by age; fine tiers by count.
    pub fn is_age_filtered(self) -> bool {
        matches!(self, Tier::Daily | Tier::Weekly)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entries of one tier: raw samples for the finest tier, roll-ups otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TierEntries {
    Samples(Vec<Sample>),
    Aggregates(Vec<AggregateRecord>),
}

impl TierEntries {
    pub fn len(&self) -> usize {
        match self {
            TierEntries::Samples(s) => s.len(),
            TierEntries::Aggregates(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Epochs in stored order.
    pub fn epochs(&self) -> Vec<f64> {
        match self {
            TierEntries::Samples(s) => s.iter().map(|x| x.epoch).collect(),
            TierEntries::Aggregates(a) => a.iter().map(|x| x.epoch).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_epoch: f64,
    pub end_epoch: f64,
    pub duration_secs: f64,
}

/// A stretch between two neighbouring entries longer than the tier's gap limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_epoch: f64,
    pub end_epoch: f64,
    pub duration_secs: f64,
}

/// `gaps` is truncated to the configured maximum; `has_gaps`/`gap_count` are the true totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    pub has_gaps: bool,
    pub gap_count: usize,
    pub gaps: Vec<Gap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub sample_count: usize,
    /// Per metric: average of the returned means, extrema of the returned min/max.
    pub metrics: BTreeMap<String, MetricSummary>,
    pub score: Option<MetricSummary>,
    /// Events whose epoch falls inside the returned time span.
    pub event_count: usize,
}

impl HistoryStats {
    pub fn max(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).map(|s| s.max)
    }

    pub fn min(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).map(|s| s.min)
    }

    pub fn avg(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).map(|s| s.mean)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub domain: String,
    pub period: Tier,
    pub time_span: Option<TimeSpan>,
    pub samples: TierEntries,
    pub stats: HistoryStats,
    pub gaps: GapReport,
    pub spikes: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentResponse {
    pub domain: String,
    pub current_sample: Option<Sample>,
    pub recent_spikes: Vec<Event>,
    pub thresholds: BTreeMap<String, Threshold>,
}
