//! CLI command modules.

pub mod http;
pub mod sessions;
pub mod status;
pub mod stream;
