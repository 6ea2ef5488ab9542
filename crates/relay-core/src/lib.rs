//! relay-core: shared model, wire format, frame codec, and configuration.
//! All other relay crates depend on this one.

pub mod codec;
pub mod config;
pub mod message;
pub mod wire;

pub use codec::{CodecError, Frame, FrameReader, FrameWriter};
pub use message::{now_millis, DataChunk, ResultMessage};
pub use wire::{Status, StatusCode};
