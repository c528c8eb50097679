// GET handlers: version, domains, history, current

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    period: Option<String>,
}

pub(super) fn unknown_domain(domain: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("unknown domain: {domain}") })),
    )
        .into_response()
}

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/domains
pub(super) async fn domains_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engines.keys().cloned().collect::<Vec<_>>())
}

/// GET /api/{domain}/history?period=finest|hourly|daily|weekly — unknown or missing period = finest.
pub(super) async fn history_handler(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let Some(engine) = state.engine(&domain) else {
        return unknown_domain(&domain);
    };
    let period = q.period.unwrap_or_else(|| "finest".into());
    Json(engine.history(&period)).into_response()
}

/// GET /api/{domain}/current
pub(super) async fn current_handler(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Response {
    let Some(engine) = state.engine(&domain) else {
        return unknown_domain(&domain);
    };
    Json(engine.current()).into_response()
}
