//! Control message types.
//!
//! Field numbers follow the `Wrapper` protobuf schema, so frames are
//! byte-compatible with any peer built from the same `.proto`.

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Announces an upload of `size` bytes under `file_name`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StorageRequest {
    #[prost(string, tag = "1")]
    pub file_name: String,
    #[prost(uint64, tag = "2")]
    pub size: u64,
}

/// Asks the server to send `file_name`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RetrievalRequest {
    #[prost(string, tag = "1")]
    pub file_name: String,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Generic acknowledgment or rejection with a human-readable reason.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Response {
    #[prost(bool, tag = "1")]
    pub ok: bool,
    #[prost(string, tag = "2")]
    pub message: String,
}

/// Answer to a [`RetrievalRequest`]: availability plus the body size.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RetrievalResponse {
    #[prost(message, optional, tag = "1")]
    pub resp: Option<Response>,
    #[prost(uint64, tag = "2")]
    pub size: u64,
}

impl RetrievalResponse {
    /// Whether the server accepted the request.
    ///
    /// A missing embedded response counts as a rejection.
    pub fn ok(&self) -> bool {
        self.resp.as_ref().is_some_and(|r| r.ok)
    }

    /// The server's reason text, empty if none was sent.
    pub fn message(&self) -> &str {
        self.resp.as_ref().map_or("", |r| r.message.as_str())
    }
}

/// Digest of a body, sent by whichever side produced the body.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ChecksumVerification {
    #[prost(bytes = "vec", tag = "1")]
    pub checksum: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The single tagged union carried by every frame.
#[derive(Clone, PartialEq, prost::Oneof)]
pub enum Message {
    #[prost(message, tag = "1")]
    StorageRequest(StorageRequest),
    #[prost(message, tag = "2")]
    RetrievalRequest(RetrievalRequest),
    #[prost(message, tag = "3")]
    Response(Response),
    #[prost(message, tag = "4")]
    RetrievalResponse(RetrievalResponse),
    #[prost(message, tag = "5")]
    ChecksumVerification(ChecksumVerification),
}

/// Outer protobuf message holding at most one [`Message`].
///
/// An envelope with no variant set is how a peer says it is done.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Envelope {
    #[prost(oneof = "Message", tags = "1, 2, 3, 4, 5")]
    pub msg: Option<Message>,
}

impl From<Message> for Envelope {
    fn from(msg: Message) -> Self {
        Self { msg: Some(msg) }
    }
}

impl Message {
    pub fn storage_request(file_name: impl Into<String>, size: u64) -> Self {
        Message::StorageRequest(StorageRequest {
            file_name: file_name.into(),
            size,
        })
    }

    pub fn retrieval_request(file_name: impl Into<String>) -> Self {
        Message::RetrievalRequest(RetrievalRequest {
            file_name: file_name.into(),
        })
    }

    pub fn response(ok: bool, message: impl Into<String>) -> Self {
        Message::Response(Response {
            ok,
            message: message.into(),
        })
    }

    pub fn retrieval_response(ok: bool, message: impl Into<String>, size: u64) -> Self {
        Message::RetrievalResponse(RetrievalResponse {
            resp: Some(Response {
                ok,
                message: message.into(),
            }),
            size,
        })
    }

    pub fn checksum(checksum: impl Into<Vec<u8>>) -> Self {
        Message::ChecksumVerification(ChecksumVerification {
            checksum: checksum.into(),
        })
    }

    /// Short variant name for logs and protocol-violation reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::StorageRequest(_) => "StorageRequest",
            Message::RetrievalRequest(_) => "RetrievalRequest",
            Message::Response(_) => "Response",
            Message::RetrievalResponse(_) => "RetrievalResponse",
            Message::ChecksumVerification(_) => "ChecksumVerification",
        }
    }
}
