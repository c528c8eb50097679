use anyhow::Result;
use std::sync::Arc;
use tierstat::collector::{SysinfoCollector, WirelessCollector};
use tierstat::engine::Engine;
use tierstat::routes::Engines;
use tierstat::worker::EngineWorker;
use tierstat::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let mut engines = Engines::new();
    let mut workers = Vec::new();

    let pressure = Arc::new(Engine::open("pressure", app_config.pressure.clone()));
    workers.push(EngineWorker::start(pressure.clone(), SysinfoCollector::new()));
    engines.insert("pressure".into(), pressure);

    if let Some(signal_config) = &app_config.signal {
        let signal = Arc::new(Engine::open("signal", signal_config.engine.clone()));
        let collector = WirelessCollector::new(signal_config.interface.clone());
        workers.push(EngineWorker::start(signal.clone(), collector));
        engines.insert("signal".into(), signal);
    }

    let app = routes::app(engines);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let served = tokio::select! {
        result = axum::serve(listener, app) => result,
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            Ok(())
        }
    };

    // Final snapshots are written even when the server failed.
    for worker in workers {
        worker.stop().await;
    }

    served?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
