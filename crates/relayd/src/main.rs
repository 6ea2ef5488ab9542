//! relayd: stream relay daemon.
//!
//! `relayd` relays producer streams to the configured processor.
//! `relayd --echo` instead serves the echo processor on the listen address.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use relay_core::config::RelayConfig;
use relay_services::{
    new_session_table, serve_echo, RelayServer, RelayStats, SessionListener, TcpConnector,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = RelayConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = RelayConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        RelayConfig::default()
    });

    let echo_mode = std::env::args().skip(1).any(|a| a == "--echo");

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    let listener = TcpListener::bind(&config.network.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.network.listen_addr))?;

    if echo_mode {
        tracing::info!(addr = %config.network.listen_addr, "relayd starting in echo mode");
        return serve_echo(listener, shutdown_tx.subscribe()).await;
    }

    tracing::info!(
        listen = %config.network.listen_addr,
        processor = %config.processor.addr,
        connect_timeout_secs = config.processor.connect_timeout_secs,
        idle_timeout_secs = config.processor.idle_timeout_secs,
        write_timeout_secs = config.relay.write_timeout_secs,
        "relayd starting"
    );

    // Shared state
    let sessions = new_session_table();
    let stats = RelayStats::new();
    let server = Arc::new(RelayServer::new(TcpConnector::from_config(&config)));

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let mut session_listener_task = tokio::spawn(
        SessionListener::new(
            listener,
            server,
            sessions.clone(),
            stats.clone(),
            config.relay.write_timeout(),
            shutdown_tx.subscribe(),
        )
        .run(),
    );

    let session_printer = {
        let sessions = sessions.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                interval.tick().await;
                let totals = stats.snapshot();
                tracing::info!(
                    count = sessions.len(),
                    accepted = totals.accepted,
                    completed = totals.completed,
                    failed = totals.failed,
                    rejected = totals.rejected,
                    "session table snapshot"
                );
                for s in sessions.iter() {
                    tracing::info!(
                        session_id = hex::encode(s.session_id.to_be_bytes()),
                        peer = %s.peer_addr,
                        uptime_secs = s.established_at.elapsed().as_secs(),
                        "  session"
                    );
                }
            }
        })
    };

    // Status HTTP endpoint
    let api_port = config.network.api_port;
    let status_server = {
        let state = relay_api::ApiState {
            sessions: sessions.clone(),
            stats: stats.clone(),
            listen_addr: config.network.listen_addr.clone(),
            processor_addr: config.processor.addr.clone(),
            shutdown_tx: shutdown_tx.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = relay_api::serve(state, api_port).await {
                tracing::error!(error = %e, "status server failed");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv()           => tracing::info!("shutting down"),
        r = &mut session_listener_task   => {
            tracing::error!("session listener exited: {:?}", r);
            return Ok(());
        }
        r = session_printer              => tracing::error!("session printer exited: {:?}", r),
        r = status_server                => tracing::error!("status server exited: {:?}", r),
    }

    // Stop accepting and let in-flight sessions finish. A second Ctrl-C
    // abandons them.
    let _ = shutdown_tx.send(());
    tracing::info!(active = sessions.len(), "waiting for in-flight sessions");
    tokio::select! {
        r = session_listener_task => match r {
            Ok(Ok(())) => tracing::info!("shutdown complete"),
            Ok(Err(e)) => tracing::error!(error = %e, "session listener failed"),
            Err(e) => tracing::error!(error = %e, "session listener panicked"),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(active = sessions.len(), "forced shutdown, dropping sessions");
        }
    }

    Ok(())
}
