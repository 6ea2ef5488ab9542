//! /sessions handlers: live session listing and inspection.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use relay_services::SessionMeta;

use super::{format_session_id, parse_session_id, ApiState};

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub peer: String,
    pub uptime_secs: u64,
}

impl From<&SessionMeta> for SessionInfo {
    fn from(meta: &SessionMeta) -> Self {
        Self {
            session_id: format_session_id(meta.session_id),
            peer: meta.peer_addr.to_string(),
            uptime_secs: meta.established_at.elapsed().as_secs(),
        }
    }
}

// ── /sessions ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionInfo>,
}

pub async fn handle_sessions(State(state): State<ApiState>) -> Json<SessionsResponse> {
    let mut sessions: Vec<SessionInfo> = state
        .sessions
        .iter()
        .map(|e| SessionInfo::from(e.value()))
        .collect();
    sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    Json(SessionsResponse { sessions })
}

// ── /sessions/:id ────────────────────────────────────────────────────────────

pub async fn handle_session_inspect(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, (StatusCode, String)> {
    let id = parse_session_id(&session_id)?;

    let session = state
        .sessions
        .get(&id)
        .ok_or((StatusCode::NOT_FOUND, "session not found".to_string()))?;

    Ok(Json(SessionInfo::from(session.value())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use relay_services::{new_session_table, RelayStats};

    fn state_with(ids: &[u64]) -> ApiState {
        let sessions = new_session_table();
        for &id in ids {
            sessions.insert(
                id,
                SessionMeta {
                    session_id: id,
                    peer_addr: "127.0.0.1:40000".parse().unwrap(),
                    established_at: Instant::now(),
                },
            );
        }
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        ApiState {
            sessions,
            stats: RelayStats::new(),
            listen_addr: "0.0.0.0:50051".into(),
            processor_addr: "127.0.0.1:50052".into(),
            shutdown_tx,
        }
    }

    #[tokio::test]
    async fn lists_sessions_in_id_order() {
        let Json(resp) = handle_sessions(State(state_with(&[3, 1, 2]))).await;
        let ids: Vec<_> = resp.sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(
            ids,
            ["0000000000000001", "0000000000000002", "0000000000000003"]
        );
    }

    #[tokio::test]
    async fn inspect_unknown_session_is_not_found() {
        let state = state_with(&[1]);
        let Json(found) = handle_session_inspect(
            State(state.clone()),
            Path("0000000000000001".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(found.peer, "127.0.0.1:40000");

        let (code, _) = handle_session_inspect(State(state), Path("0000000000000009".to_string()))
            .await
            .unwrap_err();
        assert_eq!(code, StatusCode::NOT_FOUND);
    }
}
