//! Checks that an inbound frame is the variant the exchange is waiting for.

use ferry_protocol::{FrameError, Inbound, Message, Response, RetrievalResponse};

use crate::TransferError;

fn describe(inbound: &Inbound) -> &'static str {
    match inbound {
        Inbound::Message(msg) => msg.kind(),
        Inbound::Empty => "empty message",
    }
}

pub(crate) fn response(inbound: Inbound) -> Result<Response, TransferError> {
    match inbound {
        Inbound::Message(Message::Response(resp)) => Ok(resp),
        other => Err(TransferError::unexpected("Response", describe(&other))),
    }
}

pub(crate) fn retrieval_response(inbound: Inbound) -> Result<RetrievalResponse, TransferError> {
    match inbound {
        Inbound::Message(Message::RetrievalResponse(resp)) => Ok(resp),
        other => Err(TransferError::unexpected("RetrievalResponse", describe(&other))),
    }
}

/// Extracts the peer's digest after a body.
///
/// Failing to read the frame at all is also a protocol violation here: the
/// peer owed us a checksum and did not deliver it.
pub(crate) fn checksum(received: Result<Inbound, FrameError>) -> Result<Vec<u8>, TransferError> {
    match received {
        Ok(Inbound::Message(Message::ChecksumVerification(c))) => Ok(c.checksum),
        Ok(other) => Err(TransferError::unexpected(
            "ChecksumVerification",
            describe(&other),
        )),
        Err(e) => Err(TransferError::ProtocolViolation(format!(
            "no checksum received: {e}"
        ))),
    }
}
