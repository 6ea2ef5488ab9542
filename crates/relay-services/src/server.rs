//! Server endpoint: turns one accepted producer stream into one session.
//!
//! Holds nothing but the connector used to open a processor stream per
//! session; every session's state lives in its own `RelayBridge`.

use crate::bridge::{RelayBridge, SessionSummary};
use crate::error::RelayError;
use crate::gateway::GatewayConnector;
use crate::inbound::InboundStream;

pub struct RelayServer<C> {
    connector: C,
}

impl<C: GatewayConnector> RelayServer<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run one producer connection to completion and return its outcome.
    ///
    /// If the processor cannot be reached the producer is rejected with a
    /// BackendUnavailable status before any chunk is read.
    pub async fn handle_connection(
        &self,
        session_id: u64,
        inbound: InboundStream,
    ) -> Result<SessionSummary, RelayError> {
        let gateway = match self.connector.connect().await {
            Ok(g) => g,
            Err(e) => {
                let err = RelayError::BackendUnavailable(e.to_string());
                tracing::warn!(session_id, error = %err, "rejecting producer");
                let (_chunks, mut results) = inbound.split();
                if let Err(e) = results.finish(&err.to_status()).await {
                    tracing::debug!(session_id, error = %e, "rejection status not delivered");
                }
                return Err(err);
            }
        };

        RelayBridge::new(session_id, inbound, gateway).run().await
    }
}
