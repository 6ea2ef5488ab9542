//! HTTP API handlers: exposes relay state as JSON.

pub mod sessions;
pub mod status;

use axum::http::StatusCode;

use relay_services::{RelayStats, SessionTable};

#[derive(Clone)]
pub struct ApiState {
    pub sessions: SessionTable,
    pub stats: RelayStats,
    /// Producer-facing listen address, as configured.
    pub listen_addr: String,
    /// Processor address every session dials.
    pub processor_addr: String,
    /// Signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Session ids are rendered as 16 hex digits.
fn format_session_id(id: u64) -> String {
    hex::encode(id.to_be_bytes())
}

fn parse_session_id(hex_str: &str) -> Result<u64, (StatusCode, String)> {
    let bytes =
        hex::decode(hex_str).map_err(|_| (StatusCode::BAD_REQUEST, "invalid hex".to_string()))?;
    let arr: [u8; 8] = bytes.try_into().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "session_id must be 8 bytes".to_string(),
        )
    })?;
    Ok(u64::from_be_bytes(arr))
}

// Re-export handler functions for use in router setup.
pub use sessions::{handle_session_inspect, handle_sessions};
pub use status::{handle_shutdown, handle_status};
