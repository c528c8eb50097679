// HTTP + WebSocket routes over the engines' history/current queries.

mod http;
mod ws;

use axum::{Router, routing::get};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::engine::Engine;

/// Engines by domain name ("pressure", "signal").
pub type Engines = BTreeMap<String, Arc<Engine>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) engines: Arc<Engines>,
}

impl AppState {
    pub(crate) fn engine(&self, domain: &str) -> Option<Arc<Engine>> {
        self.engines.get(domain).cloned()
    }
}

pub fn app(engines: Engines) -> Router {
    let state = AppState {
        engines: Arc::new(engines),
    };
    Router::new()
        .route("/", get(|| async { "tierstat: tiered telemetry history" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/domains", get(http::domains_handler)) // GET /api/domains
        .route("/api/{domain}/history", get(http::history_handler)) // GET /api/{domain}/history?period=
        .route("/api/{domain}/current", get(http::current_handler)) // GET /api/{domain}/current
        .route("/ws/{domain}", get(ws::ws_current)) // WS /ws/{domain}
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
