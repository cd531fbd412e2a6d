//! Wire protocol for ferry file transfers.
//!
//! Every control message travels as one frame:
//!
//! ```text
//! [8 bytes LE: payload_len]
//! [payload_len bytes: protobuf-encoded Envelope]
//! ```
//!
//! File bodies are never framed. They follow the control message that
//! announced them as a raw byte run whose length was negotiated beforehand.

pub mod checksum;
pub mod error;
pub mod frame;
pub mod messages;

// Re-export primary types for convenience.
pub use checksum::{Checksum, DIGEST_LEN, Digest, verify};
pub use error::FrameError;
pub use frame::{Inbound, read_message, write_envelope, write_message};
pub use messages::{
    ChecksumVerification, Envelope, Message, RetrievalRequest, RetrievalResponse, Response,
    StorageRequest,
};
