// Boundary-aligned roll-up: when to close a window (BoundaryWindow) and how to reduce it.
// Higher tiers reduce lower-tier means, not raw samples (each record counts once).

use std::collections::BTreeMap;

use crate::models::{AggregateRecord, MetricSummary, Sample, timestamp_from_epoch};

/// Buffers constituents of the open window and closes it on a wall-clock boundary.
///
/// Boundaries are `epoch` truncated to `boundary_secs` (UTC), so alignment survives restarts.
#[derive(Debug, Clone)]
pub struct BoundaryWindow<T> {
    boundary_secs: i64,
    buffer: Vec<T>,
    last_boundary: Option<i64>,
}

impl<T> BoundaryWindow<T> {
    pub fn new(boundary_secs: u64) -> Self {
        Self {
            boundary_secs: (boundary_secs as i64).max(1),
            buffer: Vec::new(),
            last_boundary: None,
        }
    }

    /// Start of the wall-clock window containing `epoch`.
    pub fn boundary_for(&self, epoch: f64) -> i64 {
        (epoch.floor() as i64).div_euclid(self.boundary_secs) * self.boundary_secs
    }

    /// Appends `item` (observed at `epoch`). When `epoch` lies past the last recorded
    /// boundary, returns the new boundary and the drained window, `item` included.
    /// The first call only records a boundary.
    pub fn push(&mut self, epoch: f64, item: T) -> Option<(i64, Vec<T>)> {
        self.buffer.push(item);
        let boundary = self.boundary_for(epoch);
        match self.last_boundary {
            None => {
                self.last_boundary = Some(boundary);
                None
            }
            Some(last) if boundary > last => {
                self.last_boundary = Some(boundary);
                Some((boundary, std::mem::take(&mut self.buffer)))
            }
            Some(_) => None,
        }
    }

    pub fn last_boundary(&self) -> Option<i64> {
        self.last_boundary
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Reduces raw samples into one record. `None` when `samples` is empty.
pub fn aggregate_samples(samples: &[Sample], boundary_epoch: i64) -> Option<AggregateRecord> {
    let last = samples.last()?;

    let mut per_metric: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for s in samples {
        for (name, value) in &s.values {
            per_metric.entry(name.as_str()).or_default().push(*value);
        }
    }
    let metrics = per_metric
        .into_iter()
        .map(|(name, values)| (name.to_string(), summarize_points(&values)))
        .collect();

    let scores: Vec<f64> = samples.iter().map(|s| s.score).collect();

    Some(AggregateRecord {
        timestamp: timestamp_from_epoch(last.epoch),
        epoch: last.epoch,
        boundary_epoch,
        count: samples.len(),
        sample_count: samples.len(),
        metrics,
        score: summarize_points(&scores),
    })
}

/// Reduces lower-tier records into one record: mean of means, min of mins, max of maxes.
pub fn aggregate_records(
    records: &[AggregateRecord],
    boundary_epoch: i64,
) -> Option<AggregateRecord> {
    let last = records.last()?;

    let mut per_metric: BTreeMap<&str, Vec<MetricSummary>> = BTreeMap::new();
    for r in records {
        for (name, summary) in &r.metrics {
            per_metric.entry(name.as_str()).or_default().push(*summary);
        }
    }
    let metrics = per_metric
        .into_iter()
        .map(|(name, summaries)| (name.to_string(), summarize_summaries(&summaries)))
        .collect();

    let scores: Vec<MetricSummary> = records.iter().map(|r| r.score).collect();

    Some(AggregateRecord {
        timestamp: timestamp_from_epoch(last.epoch),
        epoch: last.epoch,
        boundary_epoch,
        count: records.len(),
        sample_count: records.iter().map(|r| r.sample_count).sum(),
        metrics,
        score: summarize_summaries(&scores),
    })
}

pub(crate) fn summarize_points(values: &[f64]) -> MetricSummary {
    if values.is_empty() {
        return MetricSummary::point(0.0);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    MetricSummary {
        // Summation rounding can land a hair outside the extrema.
        mean: mean_f64(values).clamp(min, max),
        min,
        max,
    }
}

pub(crate) fn summarize_summaries(summaries: &[MetricSummary]) -> MetricSummary {
    if summaries.is_empty() {
        return MetricSummary::point(0.0);
    }
    let min = summaries.iter().map(|s| s.min).fold(f64::INFINITY, f64::min);
    let max = summaries
        .iter()
        .map(|s| s.max)
        .fold(f64::NEG_INFINITY, f64::max);
    let mean = mean_f64(&summaries.iter().map(|s| s.mean).collect::<Vec<_>>());
    MetricSummary {
        mean: mean.clamp(min, max),
        min,
        max,
    }
}

pub(crate) fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}
