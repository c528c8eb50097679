// Static warning/critical thresholds per metric and the per-sample detector.
// No hysteresis: every breaching sample yields its own event.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Event, Sample, Severity};

/// Which side of the threshold is bad. Fixed per metric in config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
    #[serde(default)]
    pub direction: Direction,
}

impl Threshold {
    pub fn above(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::Above,
        }
    }

    pub fn below(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::Below,
        }
    }

    /// Severity of `value`; reaching a threshold exactly counts as crossing it.
    /// Critical wins when both are crossed.
    pub fn classify(&self, value: f64) -> Option<Severity> {
        let crossed = |limit: f64| match self.direction {
            Direction::Above => value >= limit,
            Direction::Below => value <= limit,
        };
        if crossed(self.critical) {
            Some(Severity::Critical)
        } else if crossed(self.warning) {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    fn limit(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Warning => self.warning,
            Severity::Critical => self.critical,
        }
    }
}

pub type ThresholdTable = BTreeMap<String, Threshold>;

/// Zero or one event per configured metric present in `sample`.
pub fn detect(sample: &Sample, thresholds: &ThresholdTable) -> Vec<Event> {
    let mut events = Vec::new();
    for (metric, threshold) in thresholds {
        let Some(value) = sample.value(metric) else {
            continue;
        };
        let Some(severity) = threshold.classify(value) else {
            continue;
        };
        let context = sample
            .values
            .iter()
            .filter(|(name, _)| *name != metric)
            .map(|(name, v)| (name.clone(), *v))
            .collect();
        events.push(Event {
            timestamp: sample.timestamp,
            epoch: sample.epoch,
            metric: metric.clone(),
            severity,
            value,
            threshold: threshold.limit(severity),
            context,
        });
    }
    events
}
