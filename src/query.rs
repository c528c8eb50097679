// Query engine: pure functions over copies taken from the store. Nothing here runs under the lock.

use std::collections::BTreeMap;

use crate::models::{
    Event, Gap, GapReport, HistoryStats, MetricSummary, TierEntries, TimeSpan,
    timestamp_from_epoch,
};
use crate::tiers::aggregation::{summarize_points, summarize_summaries};

/// Per-metric average/min/max over `entries`, plus the events inside their time span.
///
/// Raw samples contribute their values; roll-ups contribute mean/min/max, so extrema
/// reflect the underlying samples rather than the window means.
pub fn compute_stats(entries: &TierEntries, events: &[Event]) -> HistoryStats {
    let (metrics, score) = match entries {
        TierEntries::Samples(samples) => {
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
            let score = (!scores.is_empty()).then(|| summarize_points(&scores));
            (metrics, score)
        }
        TierEntries::Aggregates(records) => {
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
            let score = (!scores.is_empty()).then(|| summarize_summaries(&scores));
            (metrics, score)
        }
    };

    let epochs = entries.epochs();
    let event_count = match time_span(&epochs) {
        Some(span) => events_within(events, span.start_epoch, span.end_epoch).len(),
        None => 0,
    };

    HistoryStats {
        sample_count: entries.len(),
        metrics,
        score,
        event_count,
    }
}

/// Walks neighbouring epochs; a delta of at least `threshold_secs` is a gap.
/// Only the first `max_reported` gaps are listed, the totals are always exact.
pub fn detect_gaps(epochs: &[f64], threshold_secs: f64, max_reported: usize) -> GapReport {
    let mut report = GapReport::default();
    for pair in epochs.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let delta = end - start;
        if delta < threshold_secs {
            continue;
        }
        report.gap_count += 1;
        if report.gaps.len() < max_reported {
            report.gaps.push(Gap {
                start: timestamp_from_epoch(start),
                end: timestamp_from_epoch(end),
                start_epoch: start,
                end_epoch: end,
                duration_secs: delta,
            });
        }
    }
    report.has_gaps = report.gap_count > 0;
    report
}

/// First to last epoch; `None` for an empty tier.
pub fn time_span(epochs: &[f64]) -> Option<TimeSpan> {
    let (first, last) = (*epochs.first()?, *epochs.last()?);
    Some(TimeSpan {
        start: timestamp_from_epoch(first),
        end: timestamp_from_epoch(last),
        start_epoch: first,
        end_epoch: last,
        duration_secs: last - first,
    })
}

/// Events with `start <= epoch <= end`, in log order.
pub fn events_within(events: &[Event], start: f64, end: f64) -> Vec<Event> {
    events
        .iter()
        .filter(|e| e.epoch >= start && e.epoch <= end)
        .cloned()
        .collect()
}

/// Events from the trailing `window_secs` before `now`.
pub fn recent_events(events: &[Event], now: f64, window_secs: f64) -> Vec<Event> {
    let cutoff = now - window_secs;
    events
        .iter()
        .filter(|e| e.epoch >= cutoff)
        .cloned()
        .collect()
}
