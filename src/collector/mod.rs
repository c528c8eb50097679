// Snapshot producers. The worker calls `collect` once per tick; an error skips that tick.

mod linux;

use std::future::Future;
use std::sync::{Arc, Mutex};

use sysinfo::System;
use tracing::instrument;

use crate::models::MetricValues;

pub use linux::parse_proc_wireless;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("collector lock poisoned")]
    Poisoned,
    #[error("collector task join: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("wireless interface {0} not listed in /proc/net/wireless")]
    InterfaceNotFound(String),
    #[error("no wireless interface listed in /proc/net/wireless")]
    NoInterface,
    #[error("malformed /proc/net/wireless line: {0}")]
    Parse(String),
    #[error("collector not supported on this platform")]
    Unsupported,
}

/// Source of flat metric snapshots for one domain.
pub trait Collector: Send + 'static {
    fn collect(&mut self) -> impl Future<Output = Result<MetricValues, CollectError>> + Send;
}

/// Pressure metrics from sysinfo: `cpu`, `memory`, `swap` (percent) and `load_1m`.
pub struct SysinfoCollector {
    sys: Arc<Mutex<System>>,
}

impl Default for SysinfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoCollector {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is a delta between refreshes; take the baseline now.
        sys.refresh_cpu_all();
        sys.refresh_memory();
        Self {
            sys: Arc::new(Mutex::new(sys)),
        }
    }
}

impl Collector for SysinfoCollector {
    #[instrument(skip(self), fields(collector = "sysinfo", operation = "collect"))]
    async fn collect(&mut self) -> Result<MetricValues, CollectError> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys.lock().map_err(|_| CollectError::Poisoned)?;
            sys.refresh_cpu_all();
            sys.refresh_memory();

            let memory = percent(
                sys.total_memory().saturating_sub(sys.available_memory()),
                sys.total_memory(),
            );
            let swap = percent(sys.used_swap(), sys.total_swap());
            let load = System::load_average();

            let mut values = MetricValues::new();
            values.insert("cpu".into(), (sys.global_cpu_usage() as f64).clamp(0.0, 100.0));
            values.insert("memory".into(), memory);
            values.insert("swap".into(), swap);
            values.insert("load_1m".into(), load.one);
            Ok(values)
        })
        .await?
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64) * 100.0
}

/// WiFi signal metrics from `/proc/net/wireless`: `link_quality` (percent), `signal_dbm`,
/// and `noise_dbm` when the driver reports it.
pub struct WirelessCollector {
    interface: Option<String>,
}

impl WirelessCollector {
    /// `interface = None` samples the first interface the kernel lists.
    pub fn new(interface: Option<String>) -> Self {
        Self { interface }
    }
}

impl Collector for WirelessCollector {
    #[instrument(skip(self), fields(collector = "wireless", operation = "collect"))]
    async fn collect(&mut self) -> Result<MetricValues, CollectError> {
        let interface = self.interface.clone();
        tokio::task::spawn_blocking(move || linux::read_wireless(interface.as_deref())).await?
    }
}
