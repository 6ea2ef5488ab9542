//! Relay wire format: the framing shared by the producer leg and the
//! processor leg.
//!
//! Every frame is a fixed `FrameHeader` followed by `length` payload bytes.
//! The header is #[repr(C, packed)] with zerocopy derives, so it is read and
//! written without any unsafe code or per-field encoding.
//!
//! Changing a field here changes the protocol for producers and processors
//! alike. Bump `FRAME_VERSION` if you do.

use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Frame Header ─────────────────────────────────────────────────────────────

/// Precedes every payload on both legs.
///
/// The receiver can validate the kind, size, and integrity of a frame before
/// handing its payload to anything else.
///
/// Wire size: 48 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    /// BLAKE3 hash of the payload bytes. A mismatch is a transport error.
    pub content_hash: [u8; 32],

    /// Milliseconds since the Unix epoch.
    /// Chunk frames: capture time at the producer.
    /// Result frames: the processor's result timestamp.
    /// Status frames: when the stream ended.
    pub timestamp: i64,

    /// Payload length in bytes, not including this header.
    pub length: u32,

    /// One of `FrameKind`.
    pub kind: u8,

    /// Bit flags:
    ///   bit    0: last chunk (Chunk frames only)
    ///   bits 1-7: reserved, must be zero
    pub flags: u8,

    /// Wire format version. Currently 0x01.
    pub version: u8,

    /// Must be zero.
    pub reserved: u8,
}

assert_eq_size!(FrameHeader, [u8; 48]);

/// Size of `FrameHeader` on the wire.
pub const HEADER_LEN: usize = std::mem::size_of::<FrameHeader>();

impl FrameHeader {
    /// Build a header describing `payload`.
    pub fn new(kind: FrameKind, flags: u8, timestamp: i64, payload: &[u8]) -> Self {
        Self {
            content_hash: *blake3::hash(payload).as_bytes(),
            timestamp,
            length: payload.len() as u32,
            kind: kind.into(),
            flags,
            version: FRAME_VERSION,
            reserved: 0,
        }
    }

    /// Check everything that can be checked before the payload is read.
    pub fn validate(&self) -> Result<FrameKind, WireError> {
        let version = self.version;
        if version != FRAME_VERSION {
            return Err(WireError::UnknownVersion(version));
        }
        let reserved = self.reserved;
        if reserved != 0 {
            return Err(WireError::ReservedByteSet(reserved));
        }
        let length = self.length as usize;
        if length > MAX_PAYLOAD {
            return Err(WireError::PayloadTooLarge(length));
        }
        let kind = FrameKind::try_from(self.kind)?;
        let flags = self.flags;
        let allowed = match kind {
            FrameKind::Chunk => FLAG_LAST_CHUNK,
            FrameKind::Result | FrameKind::Status => 0,
        };
        if flags & !allowed != 0 {
            return Err(WireError::ReservedFlagsSet(flags));
        }
        Ok(kind)
    }

    /// Verify the payload against `content_hash`.
    pub fn verify_payload(&self, payload: &[u8]) -> Result<(), WireError> {
        let expected = self.content_hash;
        if *blake3::hash(payload).as_bytes() != expected {
            return Err(WireError::HashMismatch);
        }
        Ok(())
    }
}

// ── Frame Kind ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Producer → processor: one `DataChunk`.
    Chunk = 0x01,

    /// Processor → producer: one `ResultMessage`.
    Result = 0x02,

    /// End of the sender's stream, with an outcome.
    /// Nothing may follow a Status frame.
    Status = 0x03,
}

impl TryFrom<u8> for FrameKind {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(FrameKind::Chunk),
            0x02 => Ok(FrameKind::Result),
            0x03 => Ok(FrameKind::Status),
            other => Err(WireError::UnknownKind(other)),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(k: FrameKind) -> u8 {
        k as u8
    }
}

// ── Status ───────────────────────────────────────────────────────────────────

/// Terminal outcome carried by a Status frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    BackendUnavailable,
    ProducerError,
    ProcessorError,
}

/// Status frame payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    pub fn error(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

// ── Constants ────────────────────────────────────────────────────────────────

/// Current frame format version.
pub const FRAME_VERSION: u8 = 0x01;

/// Chunk flag: this is the producer's final chunk.
pub const FLAG_LAST_CHUNK: u8 = 0x01;

/// Maximum payload size in bytes. Producers split larger inputs.
pub const MAX_PAYLOAD: usize = 8 * 1024 * 1024;

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("unknown frame kind: 0x{0:02x}")]
    UnknownKind(u8),

    #[error("unknown frame version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("payload length {0} exceeds maximum {}", MAX_PAYLOAD)]
    PayloadTooLarge(usize),

    #[error("reserved flags are non-zero: 0x{0:02x}")]
    ReservedFlagsSet(u8),

    #[error("reserved header byte is non-zero: 0x{0:02x}")]
    ReservedByteSet(u8),

    #[error("payload hash mismatch")]
    HashMismatch,

    #[error("unexpected {0:?} frame")]
    UnexpectedKind(FrameKind),
}

// ── Tests ────────────────────────────────────────────────────────────────────
