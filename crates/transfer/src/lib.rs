//! Put/get protocol engines over a length-prefixed TCP stream.
//!
//! [`TransferClient`] drives storage and retrieval exchanges from the
//! initiating side. [`TransferServer`] accepts connections and runs one
//! [`Session`] task per connection. Both stream bodies through bounded
//! buffers while computing the running checksum.

mod body;
pub mod client;
pub mod error;
mod expect;
pub mod server;
pub mod store;
mod validation;

pub use client::{TransferClient, TransferSummary};
pub use error::TransferError;
pub use server::{Session, TransferServer};
pub use store::{FileStore, PendingUpload};
pub use validation::sanitize_file_name;

/// Default body streaming buffer size (256 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Server acknowledgment once a storage request is accepted.
pub const READY_FOR_DATA: &str = "Ready for data";

/// Server acknowledgment once a stored body checks out.
pub const STORED_OK: &str = "File stored successfully";

/// Server acknowledgment once a retrieval request is accepted.
pub const READY_TO_SEND: &str = "Ready to send";

/// Server rejection when a stored body does not match its checksum.
pub const CHECKSUM_MISMATCH: &str = "Checksum mismatch";
