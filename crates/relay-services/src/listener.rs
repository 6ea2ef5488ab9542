//! Producer-facing accept loop.
//!
//! Accepts TCP connections, registers each one in the session table, and
//! hands it to the `RelayServer` on its own task so a failing session never
//! touches its neighbours. On shutdown the loop stops accepting and drains
//! the sessions still in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::gateway::GatewayConnector;
use crate::inbound::InboundStream;
use crate::server::RelayServer;
use crate::session::{RelayStats, SessionMeta, SessionTable};

pub struct SessionListener<C> {
    listener: TcpListener,
    server: Arc<RelayServer<C>>,
    sessions: SessionTable,
    stats: RelayStats,
    write_timeout: Option<Duration>,
    shutdown: broadcast::Receiver<()>,
}

impl<C: GatewayConnector> SessionListener<C> {
    pub fn new(
        listener: TcpListener,
        server: Arc<RelayServer<C>>,
        sessions: SessionTable,
        stats: RelayStats,
        write_timeout: Option<Duration>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            listener,
            server,
            sessions,
            stats,
            write_timeout,
            shutdown,
        }
    }

    /// Accept until shutdown, then stop accepting and wait for every session
    /// already running to finish before returning.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(addr = %self.listener.local_addr()?, "relay listening");
        let mut next_session_id: u64 = 1;
        let mut running = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!(active = running.len(), "session listener shutting down");
                    break;
                }

                Some(finished) = running.join_next(), if !running.is_empty() => {
                    if let Err(e) = finished {
                        tracing::warn!(error = %e, "session task panicked");
                    }
                }

                accepted = self.listener.accept() => {
                    let (socket, peer_addr) = match accepted {
                        Ok(a) => a,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    if let Err(e) = socket.set_nodelay(true) {
                        tracing::debug!(error = %e, "failed to set TCP_NODELAY on producer leg");
                    }

                    let session_id = next_session_id;
                    next_session_id += 1;

                    self.sessions.insert(
                        session_id,
                        SessionMeta {
                            session_id,
                            peer_addr,
                            established_at: Instant::now(),
                        },
                    );
                    self.stats.record_accepted();
                    tracing::info!(session_id, peer = %peer_addr, "producer connected");

                    let server = self.server.clone();
                    let sessions = self.sessions.clone();
                    let stats = self.stats.clone();
                    let inbound = InboundStream::from_tcp(socket, self.write_timeout);
                    running.spawn(async move {
                        let outcome = server.handle_connection(session_id, inbound).await;
                        stats.record_outcome(&outcome);
                        sessions.remove(&session_id);
                    });
                }
            }
        }

        // Refuse new producers while the rest drain.
        drop(self.listener);
        while let Some(finished) = running.join_next().await {
            if let Err(e) = finished {
                tracing::warn!(error = %e, "session task panicked");
            }
        }
        tracing::info!("all sessions drained");
        Ok(())
    }
}
