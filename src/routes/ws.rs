// WebSocket: live `current()` stream per domain

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::time::{Duration, timeout};

use super::AppState;
use super::http::unknown_domain;
use crate::engine::Engine;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_current(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Response {
    let Some(engine) = state.engine(&domain) else {
        return unknown_domain(&domain);
    };
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_current(socket, engine).await {
            tracing::info!(domain = %domain, "current stream error: {}", e);
        }
    })
    .into_response()
}

/// Sends `current()` once per sample interval until the client goes away.
async fn stream_current(mut socket: WebSocket, engine: Arc<Engine>) -> anyhow::Result<()> {
    tracing::info!(domain = %engine.domain(), "client connected to current stream");
    let period = Duration::from_secs(engine.config().sample_interval_secs);
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ping_interval =
        tokio::time::interval_at(tokio::time::Instant::now() + WS_PING_INTERVAL, WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let json = serde_json::to_string(&engine.current())?;
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    Ok(())
}
