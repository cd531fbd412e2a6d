fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use ferry_protocol::frame::{decode_payload, encode, encode_envelope};
    use ferry_protocol::{Envelope, Inbound, Message, read_message};

    /// Builds the expected frame from a hex payload: LE length prefix + payload.
    fn frame(payload_hex: &str) -> Vec<u8> {
        let payload = hex::decode(payload_hex.replace(' ', "")).unwrap();
        let mut out = (payload.len() as u64).to_le_bytes().to_vec();
        out.extend_from_slice(&payload);
        out
    }

    /// Asserts both directions: our encoder produces `expected`, and `expected`
    /// decodes back into `message`.
    async fn pinned(message: Message, payload_hex: &str) {
        let expected = frame(payload_hex);
        assert_eq!(
            hex::encode(encode(&message)),
            hex::encode(&expected),
            "encoding drifted for {}",
            message.kind()
        );

        let mut reader = expected.as_slice();
        let decoded = read_message(&mut reader).await.unwrap();
        assert_eq!(decoded, Inbound::Message(message));
        assert!(reader.is_empty());
    }

    // --- Requests ---

    #[tokio::test]
    async fn storage_request_bytes() {
        pinned(
            Message::storage_request("a.txt", 5),
            "0a 09 0a 05 612e747874 10 05",
        )
        .await;
    }

    #[tokio::test]
    async fn storage_request_multibyte_size() {
        pinned(
            Message::storage_request("a.txt", 300),
            "0a 0a 0a 05 612e747874 10 ac02",
        )
        .await;
    }

    #[tokio::test]
    async fn retrieval_request_bytes() {
        pinned(Message::retrieval_request("f"), "12 03 0a 01 66").await;
    }

    // --- Replies ---

    #[tokio::test]
    async fn response_bytes() {
        pinned(
            Message::response(true, "Ready for data"),
            "1a 12 08 01 12 0e 526561647920666f722064617461",
        )
        .await;
    }

    #[tokio::test]
    async fn rejected_retrieval_response_bytes() {
        // ok=false and size=0 are proto3 defaults and stay off the wire.
        pinned(
            Message::retrieval_response(false, "x", 0),
            "22 05 0a 03 12 01 78",
        )
        .await;
    }

    #[tokio::test]
    async fn accepted_retrieval_response_bytes() {
        pinned(
            Message::retrieval_response(true, "", 1),
            "22 06 0a 02 08 01 10 01",
        )
        .await;
    }

    #[tokio::test]
    async fn checksum_bytes() {
        // MD5("")
        let digest = hex::decode("d41d8cd98f00b204e9800998ecf8427e").unwrap();
        pinned(
            Message::checksum(digest),
            "2a 12 0a 10 d41d8cd98f00b204e9800998ecf8427e",
        )
        .await;
    }

    // --- Session end ---

    #[test]
    fn empty_envelope_is_eight_zero_bytes() {
        assert_eq!(encode_envelope(&Envelope::default()), vec![0u8; 8]);
        assert_eq!(decode_payload(&[]).unwrap(), Inbound::Empty);
    }

    #[tokio::test]
    async fn frames_decode_back_to_back() {
        let mut stream = frame("12 03 0a 01 66");
        stream.extend(vec![0u8; 8]);

        let mut reader = stream.as_slice();
        assert_eq!(
            read_message(&mut reader).await.unwrap(),
            Inbound::Message(Message::retrieval_request("f"))
        );
        assert_eq!(read_message(&mut reader).await.unwrap(), Inbound::Empty);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        // Field 15 (varint) ahead of a retrieval request.
        let payload = hex::decode("7801 12030a0166".replace(' ', "")).unwrap();
        assert_eq!(
            decode_payload(&payload).unwrap(),
            Inbound::Message(Message::retrieval_request("f"))
        );
    }
}
