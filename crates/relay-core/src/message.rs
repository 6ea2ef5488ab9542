//! Chunk and result model exchanged across both legs of a relay session.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One unit of producer-supplied content, e.g. a slice of an encoded video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChunk {
    /// Opaque content bytes. May be empty.
    pub payload: Bytes,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Set on the producer's final chunk.
    pub is_last: bool,
}

impl DataChunk {
    pub fn new(payload: impl Into<Bytes>, timestamp: i64, is_last: bool) -> Self {
        Self {
            payload: payload.into(),
            timestamp,
            is_last,
        }
    }

    /// Chunk stamped with the current time.
    pub fn now(payload: impl Into<Bytes>, is_last: bool) -> Self {
        Self::new(payload, now_millis(), is_last)
    }
}

/// One outcome emitted by the processor for a chunk or window of chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMessage {
    pub detected: bool,
    pub message: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

impl ResultMessage {
    pub fn new(detected: bool, message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            detected,
            message: message.into(),
            timestamp,
        }
    }
}

/// JSON body of a Result frame. The timestamp travels in the frame header.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ResultBody {
    pub detected: bool,
    pub message: String,
}

/// Milliseconds since the Unix epoch. Clocks before 1970 read as zero.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
