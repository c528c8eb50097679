// One telemetry engine per metric domain. All tier/event state sits behind a single mutex:
// the worker mutates it once per tick, readers copy what they need and compute outside it.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::models::{
    CurrentResponse, Event, HistoryResponse, MetricValues, Sample, Severity, Tier, TierEntries,
    epoch_now,
};
use crate::persistence::{self, PersistError, RestoreSummary, SnapshotDocument};
use crate::query;
use crate::score;
use crate::thresholds;
use crate::tiers::TierStore;

/// What one `record` call changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordOutcome {
    pub accepted: bool,
    pub events: Vec<Event>,
    /// Tiers that received a roll-up from this sample, finest first.
    pub promoted: Vec<Tier>,
}

pub struct Engine {
    domain: String,
    config: EngineConfig,
    store: Mutex<TierStore>,
}

impl Engine {
    /// Engine with empty tiers.
    pub fn new(domain: impl Into<String>, config: EngineConfig) -> Self {
        let store = Mutex::new(TierStore::new(&config));
        Self {
            domain: domain.into(),
            config,
            store,
        }
    }

    /// Engine restored from its snapshot file; cold start when the file is missing or unreadable.
    pub fn open(domain: impl Into<String>, config: EngineConfig) -> Self {
        let engine = Self::new(domain, config);
        engine.load_at(epoch_now());
        engine
    }

    /// Replaces in-memory state with the snapshot on disk, filtered relative to `now`.
    /// Returns `None` (and keeps empty tiers) when there is nothing usable to load.
    pub fn load_at(&self, now: f64) -> Option<RestoreSummary> {
        let doc = match persistence::read(self.snapshot_path()) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                info!(domain = %self.domain, path = %self.config.snapshot_path, "no snapshot; cold start");
                return None;
            }
            Err(e) => {
                warn!(
                    domain = %self.domain,
                    path = %self.config.snapshot_path,
                    error = %e,
                    operation = "load_snapshot",
                    "unreadable snapshot; cold start"
                );
                return None;
            }
        };
        let mut fresh = TierStore::new(&self.config);
        let summary = persistence::restore(&mut fresh, doc, &self.config, now);
        *self.lock() = fresh;
        info!(
            domain = %self.domain,
            finest = summary.finest,
            hourly = summary.hourly,
            daily = summary.daily,
            weekly = summary.weekly,
            events = summary.events,
            "snapshot restored"
        );
        Some(summary)
    }

    fn lock(&self) -> MutexGuard<'_, TierStore> {
        // A panic elsewhere never leaves the store half-written: every mutation is a ring push.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot_path(&self) -> &Path {
        Path::new(&self.config.snapshot_path)
    }

    /// Builds a sample from collector output (scored with the configured weights) and records it.
    pub fn record_values(&self, epoch: f64, values: MetricValues) -> RecordOutcome {
        let score =
            score::composite_score(&values, &self.config.score_weights, &self.config.thresholds);
        self.record(Sample::new(epoch, values, score))
    }

    /// Appends one raw sample: finest tier, roll-up cascade, threshold events.
    /// Non-finite values are dropped; a sample older than the latest one is rejected.
    pub fn record(&self, mut sample: Sample) -> RecordOutcome {
        sample.values.retain(|_, v| v.is_finite());
        if !sample.epoch.is_finite() || !sample.score.is_finite() {
            warn!(domain = %self.domain, epoch = sample.epoch, "sample with non-finite epoch or score dropped");
            return RecordOutcome::default();
        }
        let events = thresholds::detect(&sample, &self.config.thresholds);

        let promoted = {
            let mut store = self.lock();
            if let Some(latest) = store.latest_sample()
                && sample.epoch < latest.epoch
            {
                warn!(
                    domain = %self.domain,
                    epoch = sample.epoch,
                    latest = latest.epoch,
                    "out-of-order sample dropped"
                );
                return RecordOutcome::default();
            }
            let promoted = store.push_sample(sample);
            for e in &events {
                store.push_event(e.clone());
            }
            promoted
        };

        for e in &events {
            match e.severity {
                Severity::Warning => info!(
                    domain = %self.domain,
                    metric = %e.metric,
                    value = e.value,
                    threshold = e.threshold,
                    "warning threshold crossed"
                ),
                Severity::Critical => warn!(
                    domain = %self.domain,
                    metric = %e.metric,
                    value = e.value,
                    threshold = e.threshold,
                    "critical threshold crossed"
                ),
            }
        }
        for tier in &promoted {
            debug!(domain = %self.domain, tier = %tier, "roll-up promoted");
        }

        RecordOutcome {
            accepted: true,
            events,
            promoted,
        }
    }

    /// History for `period`; unknown periods fall back to the finest tier.
    pub fn history(&self, period: &str) -> HistoryResponse {
        self.history_at(period, epoch_now())
    }

    pub fn history_at(&self, period: &str, now: f64) -> HistoryResponse {
        let tier = Tier::from_period(period).unwrap_or_else(|| {
            debug!(domain = %self.domain, period, "unknown period; using finest");
            Tier::Finest
        });
        self.tier_history_at(tier, now)
    }

    pub fn tier_history_at(&self, tier: Tier, now: f64) -> HistoryResponse {
        let (entries, events) = {
            let store = self.lock();
            (store.entries(tier), store.events())
        };

        let entries = if tier.is_age_filtered() {
            let cutoff = now - self.config.retention_secs(tier);
            match entries {
                TierEntries::Aggregates(mut records) => {
                    records.retain(|r| r.epoch >= cutoff);
                    TierEntries::Aggregates(records)
                }
                TierEntries::Samples(mut samples) => {
                    samples.retain(|s| s.epoch >= cutoff);
                    TierEntries::Samples(samples)
                }
            }
        } else {
            entries
        };

        let epochs = entries.epochs();
        let time_span = query::time_span(&epochs);
        let spikes = match &time_span {
            Some(span) => query::events_within(&events, span.start_epoch, span.end_epoch),
            None => Vec::new(),
        };
        let stats = query::compute_stats(&entries, &events);
        let gap_limit =
            self.config.gap_multiplier * (self.config.nominal_interval_secs(tier) as f64);
        let gaps = query::detect_gaps(&epochs, gap_limit, self.config.max_reported_gaps);

        HistoryResponse {
            domain: self.domain.clone(),
            period: tier,
            time_span,
            samples: entries,
            stats,
            gaps,
            spikes,
        }
    }

    /// Latest sample, thresholds, and events from the trailing recent-event window.
    pub fn current(&self) -> CurrentResponse {
        self.current_at(epoch_now())
    }

    pub fn current_at(&self, now: f64) -> CurrentResponse {
        let (sample, events) = {
            let store = self.lock();
            (store.latest_sample().cloned(), store.events())
        };
        CurrentResponse {
            domain: self.domain.clone(),
            current_sample: sample,
            recent_spikes: query::recent_events(
                &events,
                now,
                self.config.recent_event_window_secs as f64,
            ),
            thresholds: self.config.thresholds.clone(),
        }
    }

    /// Copy of all tiers and events, taken under the lock.
    pub fn capture(&self, now: f64) -> SnapshotDocument {
        let store = self.lock();
        SnapshotDocument::capture(&store, &self.domain, now)
    }

    /// Writes the snapshot file. The lock is held only while copying.
    pub fn save(&self) -> Result<(), PersistError> {
        self.save_at(epoch_now())
    }

    pub fn save_at(&self, now: f64) -> Result<(), PersistError> {
        let doc = self.capture(now);
        persistence::write_atomic(self.snapshot_path(), &doc)
    }

    pub fn tier_len(&self, tier: Tier) -> usize {
        self.lock().len(tier)
    }

    pub fn event_count(&self) -> usize {
        self.lock().event_count()
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events()
    }

    pub fn latest_sample(&self) -> Option<Sample> {
        self.lock().latest_sample().cloned()
    }
}
