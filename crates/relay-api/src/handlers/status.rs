//! /status and /daemon/shutdown handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use relay_services::StatsSnapshot;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub listen_addr: String,
    pub processor_addr: String,
    pub active_sessions: usize,
    pub totals: StatsSnapshot,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        listen_addr: state.listen_addr.clone(),
        processor_addr: state.processor_addr.clone(),
        active_sessions: state.sessions.len(),
        totals: state.stats.snapshot(),
    })
}

// ── /daemon/shutdown ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

/// Stops accepting producers. Sessions in flight run to completion.
pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    let _ = state.shutdown_tx.send(());

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_services::{new_session_table, RelayStats};

    fn state() -> ApiState {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        ApiState {
            sessions: new_session_table(),
            stats: RelayStats::new(),
            listen_addr: "0.0.0.0:50051".into(),
            processor_addr: "127.0.0.1:50052".into(),
            shutdown_tx,
        }
    }

    #[tokio::test]
    async fn status_reports_totals() {
        let state = state();
        state.stats.record_accepted();

        let Json(resp) = handle_status(State(state)).await;
        assert_eq!(resp.active_sessions, 0);
        assert_eq!(resp.totals.accepted, 1);
        assert_eq!(resp.processor_addr, "127.0.0.1:50052");
    }

    #[tokio::test]
    async fn shutdown_signals_subscribers() {
        let state = state();
        let mut rx = state.shutdown_tx.subscribe();

        let Json(resp) = handle_shutdown(State(state)).await;
        assert_eq!(resp.message, "Shutdown initiated");
        assert!(rx.recv().await.is_ok());
    }
}
