//! Length-prefixed frame codec.
//!
//! # Wire format
//!
//! ```text
//! [8 bytes LE: payload_len]
//! [payload_len bytes: protobuf Envelope]
//! ```
//!
//! An envelope with no variant set decodes to [`Inbound::Empty`], which
//! peers use to end a session. It is not an error.

use prost::Message as _;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;
use crate::messages::{Envelope, Message};

/// Length prefix size in bytes.
pub const LENGTH_PREFIX_LEN: usize = 8;

/// Largest payload accepted from a peer (16 MiB).
///
/// Control messages are a few hundred bytes at most; anything bigger is a
/// desynchronized or hostile stream.
pub const MAX_FRAME_LEN: u64 = 16 * 1024 * 1024;

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A frame carrying a message variant.
    Message(Message),
    /// A well-formed frame whose envelope has no variant set.
    Empty,
}

/// Serializes a message into a complete frame (prefix + payload).
pub fn encode(message: &Message) -> Vec<u8> {
    encode_envelope(&Envelope::from(message.clone()))
}

/// Serializes an envelope into a complete frame (prefix + payload).
pub fn encode_envelope(envelope: &Envelope) -> Vec<u8> {
    let payload = envelope.encode_to_vec();
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(&payload);
    buf
}

/// Parses a frame payload (without its prefix).
pub fn decode_payload(payload: &[u8]) -> Result<Inbound, FrameError> {
    let envelope = Envelope::decode(payload)?;
    Ok(match envelope.msg {
        Some(msg) => Inbound::Message(msg),
        None => Inbound::Empty,
    })
}

/// Writes one message as a frame and flushes the writer.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<(), FrameError> {
    write_frame(writer, &encode(message)).await
}

/// Writes an arbitrary envelope, including an empty one.
pub async fn write_envelope<W: AsyncWrite + Unpin>(
    writer: &mut W,
    envelope: &Envelope,
) -> Result<(), FrameError> {
    write_frame(writer, &encode_envelope(envelope)).await
}

async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &[u8],
) -> Result<(), FrameError> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads exactly one frame and decodes it.
///
/// Waits until the prefix and the whole payload have arrived. A stream that
/// ends anywhere inside those `8 + len` bytes yields [`FrameError::Truncated`].
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Inbound, FrameError> {
    let payload_len = reader.read_u64_le().await.map_err(FrameError::from_read)?;
    if payload_len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload_len));
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(FrameError::from_read)?;

    decode_payload(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn roundtrip(message: Message) {
        let mut buf = Vec::new();
        write_message(&mut buf, &message).await.unwrap();

        let mut cursor = &buf[..];
        let parsed = read_message(&mut cursor).await.unwrap();
        assert_eq!(parsed, Inbound::Message(message));
        assert!(cursor.is_empty(), "frame left trailing bytes");
    }

    #[tokio::test]
    async fn every_variant_roundtrips() {
        roundtrip(Message::storage_request("game.bin", 5 * 1024 * 1024)).await;
        roundtrip(Message::retrieval_request("notes.txt")).await;
        roundtrip(Message::response(true, "Ready for data")).await;
        roundtrip(Message::response(false, "file exists")).await;
        roundtrip(Message::retrieval_response(true, "Ready to send", 1234)).await;
        roundtrip(Message::retrieval_response(false, "no such file", 0)).await;
        roundtrip(Message::checksum((0u8..16).collect::<Vec<_>>())).await;
    }

    #[tokio::test]
    async fn prefix_matches_payload_length() {
        let frame = encode(&Message::storage_request("a.txt", 5));
        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        prefix.copy_from_slice(&frame[..LENGTH_PREFIX_LEN]);
        assert_eq!(
            u64::from_le_bytes(prefix) as usize,
            frame.len() - LENGTH_PREFIX_LEN
        );
    }

    #[tokio::test]
    async fn empty_envelope_decodes_to_empty() {
        let mut buf = Vec::new();
        write_envelope(&mut buf, &Envelope::default()).await.unwrap();
        assert_eq!(buf, [0u8; LENGTH_PREFIX_LEN]);

        let mut cursor = &buf[..];
        assert_eq!(read_message(&mut cursor).await.unwrap(), Inbound::Empty);
    }

    #[tokio::test]
    async fn variant_with_default_fields_is_not_empty() {
        roundtrip(Message::storage_request("", 0)).await;
    }

    #[tokio::test]
    async fn truncated_prefix() {
        let frame = encode(&Message::retrieval_request("x"));
        let mut cursor = &frame[..5];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(FrameError::Truncated)
        ));
    }

    #[tokio::test]
    async fn truncated_payload() {
        let frame = encode(&Message::response(true, "Ready for data"));
        let mut cursor = &frame[..frame.len() - 1];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(FrameError::Truncated)
        ));
    }

    #[tokio::test]
    async fn closed_stream_is_truncated() {
        let mut cursor: &[u8] = &[];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(FrameError::Truncated)
        ));
    }

    #[tokio::test]
    async fn waits_for_the_whole_frame() {
        let frame = encode(&Message::storage_request("slow.bin", 99));
        let (mut tx, mut rx) = tokio::io::duplex(64);

        let reader = tokio::spawn(async move { read_message(&mut rx).await });

        // Dribble the frame in one byte at a time.
        for byte in &frame {
            tx.write_all(std::slice::from_ref(byte)).await.unwrap();
            tokio::task::yield_now().await;
        }

        let parsed = reader.await.unwrap().unwrap();
        assert_eq!(parsed, Inbound::Message(Message::storage_request("slow.bin", 99)));
    }

    #[tokio::test]
    async fn oversized_frame_rejected() {
        let prefix = (MAX_FRAME_LEN + 1).to_le_bytes();
        let mut cursor = &prefix[..];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(FrameError::TooLarge(n)) if n == MAX_FRAME_LEN + 1
        ));
    }

    #[tokio::test]
    async fn garbage_payload_is_malformed() {
        // Field 1, wire type 2, length 10, but only 1 byte follows.
        let payload = [0x0a, 0x0a, 0x01];
        let mut frame = (payload.len() as u64).to_le_bytes().to_vec();
        frame.extend_from_slice(&payload);

        let mut cursor = &frame[..];
        assert!(matches!(
            read_message(&mut cursor).await,
            Err(FrameError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn consecutive_frames() {
        let mut buf = Vec::new();
        write_message(&mut buf, &Message::retrieval_request("a")).await.unwrap();
        write_message(&mut buf, &Message::retrieval_request("b")).await.unwrap();
        write_envelope(&mut buf, &Envelope::default()).await.unwrap();

        let mut cursor = &buf[..];
        assert_eq!(
            read_message(&mut cursor).await.unwrap(),
            Inbound::Message(Message::retrieval_request("a"))
        );
        assert_eq!(
            read_message(&mut cursor).await.unwrap(),
            Inbound::Message(Message::retrieval_request("b"))
        );
        assert_eq!(read_message(&mut cursor).await.unwrap(), Inbound::Empty);
    }
}
