//! Session bookkeeping for observers: live session table and aggregate
//! counters. Nothing here is read by the pumps themselves.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;

use crate::bridge::SessionSummary;
use crate::error::RelayError;

/// Metadata about a live session.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub session_id: u64,
    /// Producer's address.
    pub peer_addr: SocketAddr,
    pub established_at: Instant,
}

/// Live sessions by id, shared between the listener and the status API.
pub type SessionTable = Arc<DashMap<u64, SessionMeta>>;

/// Create a new empty session table.
pub fn new_session_table() -> SessionTable {
    Arc::new(DashMap::new())
}

/// Aggregate counters across all sessions since startup.
#[derive(Clone, Default)]
pub struct RelayStats {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    chunks_forwarded: AtomicU64,
    results_forwarded: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub chunks_forwarded: u64,
    pub results_forwarded: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.inner.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold a finished session's outcome into the totals.
    pub fn record_outcome(&self, outcome: &Result<SessionSummary, RelayError>) {
        let c = &self.inner;
        match outcome {
            Ok(summary) => {
                c.completed.fetch_add(1, Ordering::Relaxed);
                c.chunks_forwarded
                    .fetch_add(summary.chunks_forwarded, Ordering::Relaxed);
                c.results_forwarded
                    .fetch_add(summary.results_forwarded, Ordering::Relaxed);
            }
            Err(RelayError::BackendUnavailable(_)) => {
                c.rejected.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                c.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = &self.inner;
        StatsSnapshot {
            accepted: c.accepted.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            chunks_forwarded: c.chunks_forwarded.load(Ordering::Relaxed),
            results_forwarded: c.results_forwarded.load(Ordering::Relaxed),
        }
    }
}
