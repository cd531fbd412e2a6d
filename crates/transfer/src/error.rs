//! Error types for the protocol engines.

use ferry_protocol::FrameError;

/// Errors produced by a storage or retrieval exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("framing error: {0}")]
    Framing(#[from] FrameError),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("rejected by peer: {0}")]
    Rejected(String),

    #[error("checksum mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("local I/O error: {0}")]
    LocalIo(#[source] std::io::Error),

    #[error("connection error: {0}")]
    Connection(#[source] std::io::Error),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),
}

impl TransferError {
    pub(crate) fn unexpected(expected: &str, got: &str) -> Self {
        TransferError::ProtocolViolation(format!("expected {expected}, got {got}"))
    }

    /// Reason text to put in a `Response{ok: false}` sent to the peer.
    pub(crate) fn peer_message(&self) -> String {
        match self {
            TransferError::LocalIo(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}
