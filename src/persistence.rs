// Snapshot file: one JSON document holding every tier plus the event log.
// Written to a temp file in the target directory, fsynced, then renamed over the old
// snapshot so a crash mid-write leaves the previous file intact.
//
// Document layout carries `version`; readers reject versions they do not know and the
// engine treats that like any other unreadable snapshot (cold start).

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::EngineConfig;
use crate::models::{AggregateRecord, Event, Sample, Tier, timestamp_from_epoch};
use crate::tiers::TierStore;

/// Current document version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot rename: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("unsupported snapshot version {0} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTiers {
    #[serde(default)]
    pub finest: Vec<Sample>,
    #[serde(default)]
    pub hourly: Vec<AggregateRecord>,
    #[serde(default)]
    pub daily: Vec<AggregateRecord>,
    #[serde(default)]
    pub weekly: Vec<AggregateRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub version: u32,
    pub domain: String,
    pub saved_at: DateTime<Utc>,
    pub saved_epoch: f64,
    pub tiers: SnapshotTiers,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl SnapshotDocument {
    /// Copies the store's current contents. Call with the engine lock held; write after releasing it.
    pub fn capture(store: &TierStore, domain: &str, now: f64) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            domain: domain.to_string(),
            saved_at: timestamp_from_epoch(now),
            saved_epoch: now,
            tiers: SnapshotTiers {
                finest: store.samples(),
                hourly: store.aggregates(Tier::Hourly),
                daily: store.aggregates(Tier::Daily),
                weekly: store.aggregates(Tier::Weekly),
            },
            events: store.events(),
        }
    }
}

/// Entries kept per tier (and events) by a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub finest: usize,
    pub hourly: usize,
    pub daily: usize,
    pub weekly: usize,
    pub events: usize,
}

/// Atomically replaces `path` with `doc`. Creates the parent directory if needed.
#[instrument(skip(doc), fields(operation = "save_snapshot", domain = %doc.domain))]
pub fn write_atomic(path: &Path, doc: &SnapshotDocument) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, doc)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// Reads the snapshot at `path`; `Ok(None)` when there is none (cold start).
#[instrument(fields(operation = "load_snapshot"))]
pub fn read(path: &Path) -> Result<Option<SnapshotDocument>, PersistError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let doc: SnapshotDocument = serde_json::from_slice(&bytes)?;
    if doc.version != SNAPSHOT_VERSION {
        return Err(PersistError::UnsupportedVersion(doc.version));
    }
    Ok(Some(doc))
}

/// Repopulates `store` from `doc`.
///
/// Finest and hourly keep their newest entries up to capacity regardless of age; daily,
/// weekly and events keep only entries younger than their retention window at `now`.
/// Entries that would break epoch ordering are dropped.
pub fn restore(
    store: &mut TierStore,
    doc: SnapshotDocument,
    config: &EngineConfig,
    now: f64,
) -> RestoreSummary {
    let SnapshotDocument { tiers, events, .. } = doc;

    let finest = newest_ordered(tiers.finest, |s| s.epoch, None, config.capacity(Tier::Finest));
    let mut summary = RestoreSummary {
        finest: finest.len(),
        ..Default::default()
    };
    for sample in finest {
        store.restore_sample(sample);
    }

    for (tier, records) in [
        (Tier::Hourly, tiers.hourly),
        (Tier::Daily, tiers.daily),
        (Tier::Weekly, tiers.weekly),
    ] {
        let cutoff = tier
            .is_age_filtered()
            .then(|| now - config.retention_secs(tier));
        let kept = newest_ordered(records, |r| r.epoch, cutoff, config.capacity(tier));
        match tier {
            Tier::Hourly => summary.hourly = kept.len(),
            Tier::Daily => summary.daily = kept.len(),
            Tier::Weekly => summary.weekly = kept.len(),
            Tier::Finest => {}
        }
        for record in kept {
            store.restore_aggregate(tier, record);
        }
    }

    let event_cutoff = Some(now - config.event_max_age_secs());
    let kept = newest_ordered(events, |e| e.epoch, event_cutoff, config.event_capacity);
    summary.events = kept.len();
    for event in kept {
        store.push_event(event);
    }

    summary
}

/// Drops entries older than `cutoff` or out of epoch order, then keeps the newest `capacity`.
fn newest_ordered<T>(
    entries: Vec<T>,
    epoch: impl Fn(&T) -> f64,
    cutoff: Option<f64>,
    capacity: usize,
) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(entries.len());
    let mut last = f64::NEG_INFINITY;
    for entry in entries {
        let e = epoch(&entry);
        if !e.is_finite() || e < last || cutoff.is_some_and(|c| e < c) {
            continue;
        }
        last = e;
        kept.push(entry);
    }
    let excess = kept.len().saturating_sub(capacity);
    kept.drain(..excess);
    kept
}
