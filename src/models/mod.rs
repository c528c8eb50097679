// Domain models: raw samples, roll-up records, threshold events, query responses.

mod aggregate;
mod event;
mod history;
mod sample;

pub use aggregate::{AggregateRecord, MetricSummary};
pub use event::{Event, Severity};
pub use history::{
    CurrentResponse, Gap, GapReport, HistoryResponse, HistoryStats, Tier, TierEntries, TimeSpan,
};
pub use sample::{MetricValues, Sample, epoch_now, timestamp_from_epoch};
