//! relay-services: the relay's session machinery.
//!
//! A producer connection becomes an `InboundStream`, a processor connection
//! becomes a `ProcessorGateway`, and a `RelayBridge` pumps between the two
//! until the processor ends its stream or either leg fails.

pub mod bridge;
pub mod echo;
pub mod error;
pub mod gateway;
pub mod inbound;
pub mod listener;
pub mod server;
pub mod session;

pub use bridge::{RelayBridge, SessionState, SessionSummary};
pub use echo::{run_echo_session, serve_echo, ECHO_MESSAGE};
pub use error::{GatewayError, RelayError};
pub use gateway::{
    GatewayConnector, GatewayReceiver, GatewaySender, GatewaySettings, ProcessorGateway, Received,
    TcpConnector,
};
pub use inbound::{ChunkReceiver, InboundStream, ResultSender};
pub use listener::SessionListener;
pub use server::RelayServer;
pub use session::{new_session_table, RelayStats, SessionMeta, SessionTable, StatsSnapshot};

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

/// Read half of any transport carrying frames.
pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of any transport carrying frames.
pub type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Run `fut` under an optional deadline. `on_timeout` builds the error when
/// the deadline passes.
pub(crate) async fn bounded<T, E>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T, E>>,
    on_timeout: impl FnOnce(Duration) -> E,
) -> Result<T, E> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(limit)),
        },
        None => fut.await,
    }
}
