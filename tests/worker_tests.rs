// Worker tests: real-time ticks with fake collectors, stop/flush behaviour

mod common;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{T0, feed, test_config, values};
use tempfile::TempDir;
use tierstat::collector::{CollectError, Collector};
use tierstat::engine::Engine;
use tierstat::models::{MetricValues, Tier};
use tierstat::persistence;
use tierstat::worker::EngineWorker;
use tokio::time::{Duration, sleep};

/// Yields cpu = 10, 11, 12, ... and counts calls.
struct CountingCollector {
    calls: Arc<AtomicUsize>,
}

impl Collector for CountingCollector {
    fn collect(&mut self) -> impl Future<Output = Result<MetricValues, CollectError>> + Send {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(values(&[("cpu", 10.0 + n as f64), ("memory", 40.0)])) }
    }
}

/// Fails the first `failures` calls, then succeeds.
struct FlakyCollector {
    calls: usize,
    failures: usize,
}

impl Collector for FlakyCollector {
    fn collect(&mut self) -> impl Future<Output = Result<MetricValues, CollectError>> + Send {
        self.calls += 1;
        let result = if self.calls <= self.failures {
            Err(CollectError::NoInterface)
        } else {
            Ok(values(&[("cpu", 50.0)]))
        };
        async move { result }
    }
}

/// Never completes.
struct HangingCollector;

impl Collector for HangingCollector {
    fn collect(&mut self) -> impl Future<Output = Result<MetricValues, CollectError>> + Send {
        std::future::pending()
    }
}

fn fast_engine(dir: &TempDir) -> Arc<Engine> {
    let mut config = test_config(dir.path().join("history.json").to_str().unwrap());
    config.sample_interval_secs = 1;
    config.flush_interval_secs = 1;
    config.stop_timeout_secs = 1;
    Arc::new(Engine::new("pressure", config))
}

#[tokio::test]
async fn test_worker_records_samples_and_saves_on_stop() {
    let dir = TempDir::new().unwrap();
    let engine = fast_engine(&dir);
    let calls = Arc::new(AtomicUsize::new(0));
    let worker = EngineWorker::start(
        engine.clone(),
        CountingCollector {
            calls: calls.clone(),
        },
    );

    sleep(Duration::from_millis(2500)).await;
    assert!(worker.stop().await, "worker should stop within its timeout");

    let recorded = engine.tier_len(Tier::Finest);
    assert!(recorded >= 2, "expected at least 2 samples, got {recorded}");
    assert_eq!(recorded, calls.load(Ordering::SeqCst));

    let doc = persistence::read(engine.snapshot_path())
        .unwrap()
        .expect("snapshot written on stop");
    assert_eq!(doc.domain, "pressure");
    assert_eq!(doc.tiers.finest.len(), recorded);

    // Reopening picks up where the worker left off.
    let reopened = Engine::open("pressure", engine.config().clone());
    assert_eq!(reopened.latest_sample(), engine.latest_sample());
}

#[tokio::test]
async fn test_worker_survives_collection_errors() {
    let dir = TempDir::new().unwrap();
    let engine = fast_engine(&dir);
    let worker = EngineWorker::start(
        engine.clone(),
        FlakyCollector {
            calls: 0,
            failures: 2,
        },
    );

    sleep(Duration::from_millis(3500)).await;
    assert!(worker.stop().await);
    assert!(
        engine.tier_len(Tier::Finest) >= 1,
        "loop should keep ticking after failed collections"
    );
}

#[tokio::test]
async fn test_worker_stop_saves_despite_hung_collector() {
    let dir = TempDir::new().unwrap();
    let engine = fast_engine(&dir);
    feed(&engine, T0, 10.0, 30, |_| 20.0);
    let worker = EngineWorker::start(engine.clone(), HangingCollector);

    sleep(Duration::from_millis(100)).await;
    let started = tokio::time::Instant::now();
    assert!(worker.stop().await, "stop should not wait out the timeout");
    assert!(started.elapsed() < Duration::from_millis(900));

    let doc = persistence::read(engine.snapshot_path())
        .unwrap()
        .expect("final snapshot written on stop");
    assert_eq!(doc.tiers.finest.len(), 30);
    assert_eq!(engine.tier_len(Tier::Finest), 30);
}
