//! Async frame codec over any byte stream.
//!
//! `FrameReader` and `FrameWriter` each own one direction of a connection, so
//! a socket split into halves gives two independent endpoints that never share
//! a lock.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zerocopy::{AsBytes, FromBytes};

use crate::message::{DataChunk, ResultBody, ResultMessage};
use crate::wire::{FrameHeader, FrameKind, Status, WireError, FLAG_LAST_CHUNK, HEADER_LEN};

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Chunk(DataChunk),
    Result(ResultMessage),
    Status(Status),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Wire(#[from] WireError),

    #[error("malformed frame body: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next frame. `Ok(None)` means the peer closed cleanly on a
    /// frame boundary; EOF anywhere else is an error.
    ///
    /// Not cancel safe: dropping the future mid-frame desynchronises the
    /// stream, so a cancelled reader must be discarded.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        let mut head = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = self.inner.read(&mut head[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            filled += n;
        }

        // Infallible: the buffer is exactly HEADER_LEN bytes.
        let header = FrameHeader::read_from(&head[..])
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::InvalidData))?;
        let kind = header.validate()?;

        let mut payload = vec![0u8; header.length as usize];
        self.inner.read_exact(&mut payload).await?;
        header.verify_payload(&payload)?;

        let timestamp = header.timestamp;
        let frame = match kind {
            FrameKind::Chunk => Frame::Chunk(DataChunk {
                payload: Bytes::from(payload),
                timestamp,
                is_last: header.flags & FLAG_LAST_CHUNK != 0,
            }),
            FrameKind::Result => {
                let body: ResultBody = serde_json::from_slice(&payload)?;
                Frame::Result(ResultMessage {
                    detected: body.detected,
                    message: body.message,
                    timestamp,
                })
            }
            FrameKind::Status => Frame::Status(serde_json::from_slice(&payload)?),
        };
        Ok(Some(frame))
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_chunk(&mut self, chunk: &DataChunk) -> Result<(), CodecError> {
        let flags = if chunk.is_last { FLAG_LAST_CHUNK } else { 0 };
        self.write_raw(FrameKind::Chunk, flags, chunk.timestamp, &chunk.payload)
            .await
    }

    pub async fn write_result(&mut self, result: &ResultMessage) -> Result<(), CodecError> {
        let body = serde_json::to_vec(&ResultBody {
            detected: result.detected,
            message: result.message.clone(),
        })?;
        self.write_raw(FrameKind::Result, 0, result.timestamp, &body)
            .await
    }

    pub async fn write_status(&mut self, status: &Status) -> Result<(), CodecError> {
        let body = serde_json::to_vec(status)?;
        self.write_raw(FrameKind::Status, 0, crate::message::now_millis(), &body)
            .await
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), CodecError> {
        match frame {
            Frame::Chunk(c) => self.write_chunk(c).await,
            Frame::Result(r) => self.write_result(r).await,
            Frame::Status(s) => self.write_status(s).await,
        }
    }

    /// Half-close: flush and shut down the write side. The peer reads a clean
    /// EOF after the last frame.
    pub async fn shutdown(&mut self) -> Result<(), CodecError> {
        self.inner.shutdown().await?;
        Ok(())
    }

    async fn write_raw(
        &mut self,
        kind: FrameKind,
        flags: u8,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<(), CodecError> {
        if payload.len() > crate::wire::MAX_PAYLOAD {
            return Err(WireError::PayloadTooLarge(payload.len()).into());
        }
        let header = FrameHeader::new(kind, flags, timestamp, payload);
        self.inner.write_all(header.as_bytes()).await?;
        self.inner.write_all(payload).await?;
        self.inner.flush().await?;
        Ok(())
    }
}
