//! Error types for the frame codec.

use crate::frame::MAX_FRAME_LEN;

/// Errors produced while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("connection closed before a full frame arrived")]
    Truncated,

    #[error("frame too large: {0} bytes (max {MAX_FRAME_LEN})")]
    TooLarge(u64),

    #[error("malformed message: {0}")]
    Malformed(#[from] prost::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Maps a read failure, treating early EOF as a truncated frame.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(err)
        }
    }
}
