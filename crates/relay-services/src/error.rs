//! Error taxonomy for both legs of a relay session.

use relay_core::{Status, StatusCode};

/// Transport-level failure on the processor leg.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("cannot reach processor: {0}")]
    ConnectFailed(String),

    #[error("send to processor failed: {0}")]
    SendFailed(String),

    #[error("receive from processor failed: {0}")]
    ReceiveFailed(String),
}

/// Terminal outcome of a failed session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The processor could not be reached when the session started.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Reading from or writing to the producer failed.
    #[error("producer stream failed: {0}")]
    ProducerError(String),

    /// The processor leg failed mid-session.
    #[error(transparent)]
    Processor(#[from] GatewayError),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::BackendUnavailable(_) => StatusCode::BackendUnavailable,
            RelayError::ProducerError(_) => StatusCode::ProducerError,
            RelayError::Processor(GatewayError::ConnectFailed(_)) => {
                StatusCode::BackendUnavailable
            }
            RelayError::Processor(_) => StatusCode::ProcessorError,
        }
    }

    /// The Status frame the producer receives for this error.
    pub fn to_status(&self) -> Status {
        Status::error(self.status_code(), self.to_string())
    }
}
