//! Daemon status and shutdown commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    listen_addr: String,
    processor_addr: String,
    active_sessions: usize,
    totals: Totals,
}

#[derive(Deserialize)]
struct Totals {
    accepted: u64,
    completed: u64,
    failed: u64,
    rejected: u64,
    chunks_forwarded: u64,
    results_forwarded: u64,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Relay Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Listening on     : {}", resp.listen_addr);
    println!("  Processor        : {}", resp.processor_addr);
    println!("  Active sessions  : {}", resp.active_sessions);
    println!();
    println!("  Accepted         : {}", resp.totals.accepted);
    println!("  Completed        : {}", resp.totals.completed);
    println!("  Failed           : {}", resp.totals.failed);
    println!("  Rejected         : {}", resp.totals.rejected);
    println!("  Chunks forwarded : {}", resp.totals.chunks_forwarded);
    println!("  Results relayed  : {}", resp.totals.results_forwarded);

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    #[derive(Deserialize)]
    struct ShutdownResponse {
        message: String,
    }

    let resp: ShutdownResponse = post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}
