//! Inbound stream: the producer leg of a session.
//!
//! Splits into a `ChunkReceiver` (producer → relay) and a `ResultSender`
//! (relay → producer).

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use relay_core::wire::{FrameKind, Status, WireError};
use relay_core::{DataChunk, Frame, FrameReader, FrameWriter, ResultMessage};

use crate::error::RelayError;
use crate::{bounded, BoxReader, BoxWriter};

/// Deadline for the terminal status when writes are otherwise unbounded.
const FINAL_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

pub struct InboundStream {
    receiver: ChunkReceiver,
    sender: ResultSender,
}

impl InboundStream {
    pub fn new<R, W>(reader: R, writer: W, write_timeout: Option<Duration>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            receiver: ChunkReceiver {
                reader: FrameReader::new(Box::new(reader) as BoxReader),
            },
            sender: ResultSender {
                writer: FrameWriter::new(Box::new(writer) as BoxWriter),
                write_timeout,
                finished: false,
            },
        }
    }

    pub fn from_tcp(stream: TcpStream, write_timeout: Option<Duration>) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer, write_timeout)
    }

    pub fn split(self) -> (ChunkReceiver, ResultSender) {
        (self.receiver, self.sender)
    }
}

// ── Producer → relay ─────────────────────────────────────────────────────────

pub struct ChunkReceiver {
    reader: FrameReader<BoxReader>,
}

impl ChunkReceiver {
    /// Next chunk from the producer. `Ok(None)` once the producer has
    /// half-closed (clean EOF or a Status OK frame).
    pub async fn receive(&mut self) -> Result<Option<DataChunk>, RelayError> {
        let frame = self
            .reader
            .read_frame()
            .await
            .map_err(|e| RelayError::ProducerError(e.to_string()))?;
        match frame {
            Some(Frame::Chunk(chunk)) => Ok(Some(chunk)),
            None => Ok(None),
            Some(Frame::Status(status)) if status.is_ok() => Ok(None),
            Some(Frame::Status(status)) => Err(RelayError::ProducerError(format!(
                "producer aborted with {:?}: {}",
                status.code, status.message
            ))),
            Some(Frame::Result(_)) => Err(RelayError::ProducerError(
                WireError::UnexpectedKind(FrameKind::Result).to_string(),
            )),
        }
    }
}

// ── Relay → producer ─────────────────────────────────────────────────────────

pub struct ResultSender {
    writer: FrameWriter<BoxWriter>,
    write_timeout: Option<Duration>,
    finished: bool,
}

impl ResultSender {
    pub async fn send(&mut self, result: &ResultMessage) -> Result<(), RelayError> {
        if self.finished {
            return Err(RelayError::ProducerError("stream already finished".into()));
        }
        bounded(
            self.write_timeout,
            async {
                self.writer
                    .write_result(result)
                    .await
                    .map_err(|e| RelayError::ProducerError(e.to_string()))
            },
            |limit| RelayError::ProducerError(format!("producer stalled for {}s", limit.as_secs())),
        )
        .await
    }

    /// Deliver the terminal status and shut down the write side.
    /// Only the first call writes anything. Bounded even when no write
    /// timeout is configured.
    pub async fn finish(&mut self, status: &Status) -> Result<(), RelayError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        bounded(
            Some(self.write_timeout.unwrap_or(FINAL_STATUS_TIMEOUT)),
            async {
                self.writer.write_status(status).await?;
                self.writer.shutdown().await?;
                Ok::<(), relay_core::CodecError>(())
            },
            |_| relay_core::CodecError::Io(std::io::ErrorKind::TimedOut.into()),
        )
        .await
        .map_err(|e| RelayError::ProducerError(e.to_string()))
    }
}
