//! Processor gateway: the outbound leg of a session.
//!
//! Wraps one connection to the processor as a bidirectional stream of
//! `DataChunk` out and `ResultMessage` in. The gateway splits into a
//! `GatewaySender` and a `GatewayReceiver` so each pump owns exactly one
//! direction.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use relay_core::config::RelayConfig;
use relay_core::wire::{FrameKind, WireError};
use relay_core::{DataChunk, Frame, FrameReader, FrameWriter, ResultMessage};

use crate::error::GatewayError;
use crate::{bounded, BoxReader, BoxWriter};

/// Outcome of `GatewayReceiver::receive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Result(ResultMessage),
    /// The processor finished its stream normally. Not an error.
    StreamEnded,
}

/// Per-gateway deadlines. `None` disables a deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewaySettings {
    /// Max time for one chunk write, and for the half-close.
    pub write_timeout: Option<Duration>,
    /// Max silence between results.
    pub idle_timeout: Option<Duration>,
}

impl GatewaySettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            write_timeout: config.relay.write_timeout(),
            idle_timeout: config.processor.idle_timeout(),
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────────────────

pub struct ProcessorGateway {
    sender: GatewaySender,
    receiver: GatewayReceiver,
}

impl ProcessorGateway {
    /// Wrap an established connection given as its two halves.
    pub fn new<R, W>(reader: R, writer: W, settings: GatewaySettings) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            sender: GatewaySender {
                writer: FrameWriter::new(Box::new(writer) as BoxWriter),
                closed: false,
                write_timeout: settings.write_timeout,
            },
            receiver: GatewayReceiver {
                reader: FrameReader::new(Box::new(reader) as BoxReader),
                ended: false,
                idle_timeout: settings.idle_timeout,
            },
        }
    }

    pub fn from_tcp(stream: TcpStream, settings: GatewaySettings) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer, settings)
    }

    pub async fn send(&mut self, chunk: &DataChunk) -> Result<(), GatewayError> {
        self.sender.send(chunk).await
    }

    pub async fn receive(&mut self) -> Result<Received, GatewayError> {
        self.receiver.receive().await
    }

    pub async fn close_send(&mut self) {
        self.sender.close_send().await
    }

    pub fn split(self) -> (GatewaySender, GatewayReceiver) {
        (self.sender, self.receiver)
    }
}

// ── Send half ────────────────────────────────────────────────────────────────

pub struct GatewaySender {
    writer: FrameWriter<BoxWriter>,
    closed: bool,
    write_timeout: Option<Duration>,
}

impl GatewaySender {
    /// Transmit one chunk. Chunks reach the processor in call order.
    pub async fn send(&mut self, chunk: &DataChunk) -> Result<(), GatewayError> {
        if self.closed {
            return Err(GatewayError::SendFailed("send side already closed".into()));
        }
        bounded(
            self.write_timeout,
            async {
                self.writer
                    .write_chunk(chunk)
                    .await
                    .map_err(|e| GatewayError::SendFailed(e.to_string()))
            },
            |limit| GatewayError::SendFailed(format!("write stalled for {}s", limit.as_secs())),
        )
        .await
    }

    /// Half-close: no more chunks will be sent. Results keep flowing.
    /// Idempotent; a failure here surfaces on the receive side.
    pub async fn close_send(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let result = bounded(
            self.write_timeout,
            async {
                self.writer
                    .shutdown()
                    .await
                    .map_err(|e| GatewayError::SendFailed(e.to_string()))
            },
            |limit| GatewayError::SendFailed(format!("half-close stalled for {}s", limit.as_secs())),
        )
        .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "processor half-close failed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

// ── Receive half ─────────────────────────────────────────────────────────────

pub struct GatewayReceiver {
    reader: FrameReader<BoxReader>,
    ended: bool,
    idle_timeout: Option<Duration>,
}

impl GatewayReceiver {
    /// Wait for the next result, the end of the processor's stream, or a
    /// failure. Once `StreamEnded` is returned every later call returns it too.
    pub async fn receive(&mut self) -> Result<Received, GatewayError> {
        if self.ended {
            return Ok(Received::StreamEnded);
        }
        let frame = bounded(
            self.idle_timeout,
            async {
                self.reader
                    .read_frame()
                    .await
                    .map_err(|e| GatewayError::ReceiveFailed(e.to_string()))
            },
            |limit| GatewayError::ReceiveFailed(format!("no result for {}s", limit.as_secs())),
        )
        .await?;

        match frame {
            Some(Frame::Result(result)) => Ok(Received::Result(result)),
            Some(Frame::Status(status)) if status.is_ok() => {
                self.ended = true;
                Ok(Received::StreamEnded)
            }
            Some(Frame::Status(status)) => Err(GatewayError::ReceiveFailed(format!(
                "processor ended with {:?}: {}",
                status.code, status.message
            ))),
            Some(Frame::Chunk(_)) => Err(GatewayError::ReceiveFailed(
                WireError::UnexpectedKind(FrameKind::Chunk).to_string(),
            )),
            None => {
                self.ended = true;
                Ok(Received::StreamEnded)
            }
        }
    }
}

// ── Connectors ───────────────────────────────────────────────────────────────

/// Produces a fresh gateway for each accepted producer connection.
pub trait GatewayConnector: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<ProcessorGateway, GatewayError>> + Send;
}

/// Dials the processor over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Option<Duration>,
    settings: GatewaySettings,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>, connect_timeout: Option<Duration>, settings: GatewaySettings) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            settings,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.processor.addr.clone(),
            config.processor.connect_timeout(),
            GatewaySettings::from_config(config),
        )
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl GatewayConnector for TcpConnector {
    fn connect(&self) -> impl Future<Output = Result<ProcessorGateway, GatewayError>> + Send {
        async move {
            let stream = bounded(
                self.connect_timeout,
                async {
                    TcpStream::connect(self.addr.as_str())
                        .await
                        .map_err(|e| GatewayError::ConnectFailed(format!("{}: {e}", self.addr)))
                },
                |limit| {
                    GatewayError::ConnectFailed(format!(
                        "{}: no answer within {}s",
                        self.addr,
                        limit.as_secs()
                    ))
                },
            )
            .await?;
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(error = %e, "failed to set TCP_NODELAY on processor leg");
            }
            tracing::debug!(processor = %self.addr, "processor stream opened");
            Ok(ProcessorGateway::from_tcp(stream, self.settings))
        }
    }
}
