// TOML config: server, one engine section per domain, serde defaults and startup validation.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::Tier;
use crate::thresholds::{Direction, Threshold, ThresholdTable};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pressure: EngineConfig,
    /// WiFi signal history; omitted section = engine not started.
    #[serde(default)]
    pub signal: Option<SignalConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    /// Wireless interface to sample (e.g. "wlan0"); first one listed by the kernel when unset.
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(flatten)]
    pub engine: EngineConfig,
}

/// Settings for one engine instance (one metric domain, one snapshot file).
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
    /// How often the worker writes the snapshot file (real seconds).
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    pub snapshot_path: String,
    /// Event log size; kept well above any tier so rare spikes outlive the fine samples.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Events older than this are dropped when the snapshot is reloaded.
    #[serde(default = "default_event_max_age_hours")]
    pub event_max_age_hours: u64,
    /// A neighbour delta above `gap_multiplier × nominal interval` is reported as a gap.
    #[serde(default = "default_gap_multiplier")]
    pub gap_multiplier: f64,
    #[serde(default = "default_max_reported_gaps")]
    pub max_reported_gaps: usize,
    /// Trailing window for `current().recent_spikes`.
    #[serde(default = "default_recent_event_window_secs")]
    pub recent_event_window_secs: u64,
    /// Upper bound on waiting for the worker (and its final save) at shutdown.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
    #[serde(default)]
    pub tiers: TierConfigs,
    #[serde(default)]
    pub thresholds: ThresholdTable,
    #[serde(default)]
    pub score_weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierConfigs {
    #[serde(default = "default_finest")]
    pub finest: FinestTierConfig,
    #[serde(default = "default_hourly")]
    pub hourly: RollupTierConfig,
    #[serde(default = "default_daily")]
    pub daily: RollupTierConfig,
    #[serde(default = "default_weekly")]
    pub weekly: RollupTierConfig,
}

impl Default for TierConfigs {
    fn default() -> Self {
        Self {
            finest: default_finest(),
            hourly: default_hourly(),
            daily: default_daily(),
            weekly: default_weekly(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FinestTierConfig {
    pub capacity: usize,
}

/// A tier fed by roll-ups closed every `boundary_secs` of wall-clock time.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RollupTierConfig {
    pub capacity: usize,
    pub boundary_secs: u64,
}

fn default_sample_interval_secs() -> u64 {
    10
}

fn default_flush_interval_secs() -> u64 {
    60
}

fn default_event_capacity() -> usize {
    1000
}

fn default_event_max_age_hours() -> u64 {
    24
}

fn default_gap_multiplier() -> f64 {
    3.0
}

fn default_max_reported_gaps() -> usize {
    5
}

fn default_recent_event_window_secs() -> u64 {
    300
}

fn default_stop_timeout_secs() -> u64 {
    5
}

// 60 × 10 s ≈ 10 min, 60 × 1 min = 1 h, 288 × 5 min = 24 h, 672 × 15 min = 7 d
fn default_finest() -> FinestTierConfig {
    FinestTierConfig { capacity: 60 }
}

fn default_hourly() -> RollupTierConfig {
    RollupTierConfig {
        capacity: 60,
        boundary_secs: 60,
    }
}

fn default_daily() -> RollupTierConfig {
    RollupTierConfig {
        capacity: 288,
        boundary_secs: 300,
    }
}

fn default_weekly() -> RollupTierConfig {
    RollupTierConfig {
        capacity: 672,
        boundary_secs: 900,
    }
}

/// CPU/memory/swap pressure defaults, used when `[pressure.thresholds]` is absent.
pub fn default_pressure_thresholds() -> ThresholdTable {
    BTreeMap::from([
        ("cpu".to_string(), Threshold::above(75.0, 90.0)),
        ("memory".to_string(), Threshold::above(80.0, 90.0)),
        ("swap".to_string(), Threshold::above(50.0, 80.0)),
    ])
}

pub fn default_pressure_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("cpu".to_string(), 40.0),
        ("memory".to_string(), 40.0),
        ("swap".to_string(), 20.0),
    ])
}

/// Link quality (percent) and signal level (dBm) defaults; lower is worse for both.
pub fn default_signal_thresholds() -> ThresholdTable {
    BTreeMap::from([
        ("link_quality".to_string(), Threshold::below(50.0, 30.0)),
        ("signal_dbm".to_string(), Threshold::below(-70.0, -80.0)),
    ])
}

pub fn default_signal_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([("link_quality".to_string(), 100.0)])
}

impl EngineConfig {
    /// All defaults, persisting to `snapshot_path`. Thresholds and weights start empty.
    pub fn with_snapshot_path(snapshot_path: impl Into<String>) -> Self {
        Self {
            sample_interval_secs: default_sample_interval_secs(),
            flush_interval_secs: default_flush_interval_secs(),
            snapshot_path: snapshot_path.into(),
            event_capacity: default_event_capacity(),
            event_max_age_hours: default_event_max_age_hours(),
            gap_multiplier: default_gap_multiplier(),
            max_reported_gaps: default_max_reported_gaps(),
            recent_event_window_secs: default_recent_event_window_secs(),
            stop_timeout_secs: default_stop_timeout_secs(),
            tiers: TierConfigs::default(),
            thresholds: ThresholdTable::new(),
            score_weights: BTreeMap::new(),
        }
    }

    pub fn capacity(&self, tier: Tier) -> usize {
        match tier {
            Tier::Finest => self.tiers.finest.capacity,
            Tier::Hourly => self.tiers.hourly.capacity,
            Tier::Daily => self.tiers.daily.capacity,
            Tier::Weekly => self.tiers.weekly.capacity,
        }
    }

    /// Expected spacing between neighbouring entries of `tier`.
    pub fn nominal_interval_secs(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Finest => self.sample_interval_secs,
            Tier::Hourly => self.tiers.hourly.boundary_secs,
            Tier::Daily => self.tiers.daily.boundary_secs,
            Tier::Weekly => self.tiers.weekly.boundary_secs,
        }
    }

    /// Nominal retention window: capacity × interval.
    pub fn retention_secs(&self, tier: Tier) -> f64 {
        (self.capacity(tier) as f64) * (self.nominal_interval_secs(tier) as f64)
    }

    pub fn event_max_age_secs(&self) -> f64 {
        (self.event_max_age_hours * 3600) as f64
    }

    fn fill_defaults(&mut self, thresholds: ThresholdTable, weights: BTreeMap<String, f64>) {
        if self.thresholds.is_empty() {
            self.thresholds = thresholds;
        }
        if self.score_weights.is_empty() {
            self.score_weights = weights;
        }
    }

    pub fn validate(&self, section: &str) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.sample_interval_secs > 0,
            "{section}.sample_interval_secs must be > 0, got {}",
            self.sample_interval_secs
        );
        anyhow::ensure!(
            self.flush_interval_secs > 0,
            "{section}.flush_interval_secs must be > 0, got {}",
            self.flush_interval_secs
        );
        anyhow::ensure!(
            !self.snapshot_path.is_empty(),
            "{section}.snapshot_path must be non-empty"
        );
        anyhow::ensure!(
            self.event_max_age_hours > 0,
            "{section}.event_max_age_hours must be > 0, got {}",
            self.event_max_age_hours
        );
        anyhow::ensure!(
            self.gap_multiplier > 1.0,
            "{section}.gap_multiplier must be > 1.0, got {}",
            self.gap_multiplier
        );
        anyhow::ensure!(
            self.max_reported_gaps > 0,
            "{section}.max_reported_gaps must be > 0, got {}",
            self.max_reported_gaps
        );
        anyhow::ensure!(
            self.recent_event_window_secs > 0,
            "{section}.recent_event_window_secs must be > 0, got {}",
            self.recent_event_window_secs
        );
        anyhow::ensure!(
            self.stop_timeout_secs > 0,
            "{section}.stop_timeout_secs must be > 0, got {}",
            self.stop_timeout_secs
        );
        for tier in Tier::ALL {
            let capacity = self.capacity(tier);
            anyhow::ensure!(
                capacity > 0,
                "{section}.tiers.{tier}.capacity must be > 0, got {capacity}"
            );
            anyhow::ensure!(
                self.event_capacity > capacity,
                "{section}.event_capacity must exceed {section}.tiers.{tier}.capacity ({capacity}), got {}",
                self.event_capacity
            );
        }
        // Windows are wall-clock aligned, so the sample interval need not divide the first boundary.
        let hourly = self.tiers.hourly.boundary_secs;
        anyhow::ensure!(
            hourly >= self.sample_interval_secs,
            "{section}.tiers.hourly.boundary_secs must be at least sample_interval_secs ({}), got {hourly}",
            self.sample_interval_secs
        );
        let mut previous = hourly;
        for tier in [Tier::Daily, Tier::Weekly] {
            let boundary = self.nominal_interval_secs(tier);
            anyhow::ensure!(
                boundary > previous,
                "{section}.tiers.{tier}.boundary_secs must be larger than the tier below ({previous}), got {boundary}"
            );
            anyhow::ensure!(
                boundary % previous == 0,
                "{section}.tiers.{tier}.boundary_secs must be a multiple of {previous}, got {boundary}"
            );
            previous = boundary;
        }
        for (metric, t) in &self.thresholds {
            anyhow::ensure!(
                t.warning.is_finite() && t.critical.is_finite(),
                "{section}.thresholds.{metric} must be finite"
            );
            let ordered = match t.direction {
                Direction::Above => t.warning <= t.critical,
                Direction::Below => t.warning >= t.critical,
            };
            anyhow::ensure!(
                ordered,
                "{section}.thresholds.{metric}: warning ({}) and critical ({}) out of order for direction {:?}",
                t.warning,
                t.critical,
                t.direction
            );
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse, fill per-domain defaults and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let mut config: AppConfig = toml::from_str(s)?;
        config
            .pressure
            .fill_defaults(default_pressure_thresholds(), default_pressure_weights());
        if let Some(signal) = config.signal.as_mut() {
            signal
                .engine
                .fill_defaults(default_signal_thresholds(), default_signal_weights());
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        self.pressure.validate("pressure")?;
        if let Some(signal) = &self.signal {
            signal.engine.validate("signal")?;
            anyhow::ensure!(
                signal.engine.snapshot_path != self.pressure.snapshot_path,
                "signal.snapshot_path must differ from pressure.snapshot_path"
            );
        }
        Ok(())
    }
}
