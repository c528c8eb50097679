// Background sampling loop, one per engine: collect -> record (tiers, roll-ups, events),
// flush the snapshot on its own slower cadence, and save once more on stop.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval, interval_at};
use tracing::Instrument;

use crate::collector::Collector;
use crate::engine::Engine;
use crate::models::epoch_now;
use crate::persistence;

/// Running worker plus its stop signal.
pub struct EngineWorker {
    domain: String,
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
    stop_timeout: Duration,
}

impl EngineWorker {
    /// Spawns the sampling loop for `engine`, fed by `collector`.
    pub fn start<C: Collector>(engine: Arc<Engine>, collector: C) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let domain = engine.domain().to_string();
        let stop_timeout = Duration::from_secs(engine.config().stop_timeout_secs);
        let handle = spawn(engine, collector, shutdown_rx);
        Self {
            domain,
            handle,
            shutdown_tx,
            stop_timeout,
        }
    }

    /// Signals the loop, then waits up to the configured timeout for it to finish its final
    /// save. Returns false (and aborts the task) if it did not stop in time.
    pub async fn stop(self) -> bool {
        let Self {
            domain,
            mut handle,
            shutdown_tx,
            stop_timeout,
        } = self;
        let _ = shutdown_tx.send(());
        match tokio::time::timeout(stop_timeout, &mut handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(domain = %domain, error = %e, "worker task failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    domain = %domain,
                    timeout_secs = stop_timeout.as_secs(),
                    "worker did not stop in time; aborting"
                );
                handle.abort();
                false
            }
        }
    }
}

/// Spawns the loop. It exits when `shutdown_rx` fires or its sender is dropped.
pub fn spawn<C: Collector>(
    engine: Arc<Engine>,
    mut collector: C,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    let sample_interval = Duration::from_secs(engine.config().sample_interval_secs);
    let flush_interval = Duration::from_secs(engine.config().flush_interval_secs);
    let worker_span = tracing::span!(
        tracing::Level::DEBUG,
        "worker",
        domain = %engine.domain(),
        sample_interval_secs = sample_interval.as_secs()
    );

    let task = async move {
        let mut tick = interval(sample_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut flush_tick = interval_at(Instant::now() + flush_interval, flush_interval);
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!("worker shutting down");
                    break;
                }
                _ = tick.tick() => {
                    // A stuck collector must not hold off shutdown and the final save.
                    let collected = tokio::select! {
                        result = collector.collect() => result,
                        _ = &mut shutdown_rx => {
                            tracing::debug!("worker shutting down during collect");
                            break;
                        }
                    };
                    match collected {
                        Ok(values) => {
                            engine.record_values(epoch_now(), values);
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                operation = "collect",
                                "collection failed; tick skipped"
                            );
                        }
                    }
                }
                _ = flush_tick.tick() => {
                    flush_snapshot(&engine).await;
                }
            }
        }

        flush_snapshot(&engine).await;
    };
    tokio::spawn(task.instrument(worker_span))
}

/// Copies state under the lock, then writes the file on the blocking pool.
/// Failures are logged; the next flush retries.
async fn flush_snapshot(engine: &Arc<Engine>) {
    let doc = engine.capture(epoch_now());
    let path = engine.snapshot_path().to_path_buf();
    match tokio::task::spawn_blocking(move || persistence::write_atomic(&path, &doc)).await {
        Ok(Ok(())) => {
            tracing::debug!(operation = "save_snapshot", "snapshot saved");
        }
        Ok(Err(e)) => {
            tracing::warn!(
                error = %e,
                operation = "save_snapshot",
                "snapshot save failed; will retry at next flush"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, operation = "save_snapshot", "snapshot task join failed");
        }
    }
}
