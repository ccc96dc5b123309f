//! Frame codec.
//!
//! Converts payloads to and from the textual wire representation used by
//! the request/response transport:
//!
//! | Direction | Text | Binary |
//! |-----------|------|--------|
//! | Outbound | UTF-8 string as-is | radix-64 (base64, padded) |
//! | Inbound | radix-64 of the UTF-8 bytes | radix-64 |
//!
//! Encoding and decoding walk the input in bounded chunks so that payload
//! size never hits a per-call limit of the encoding primitive. Chunk sizes
//! are multiples of 3 (encode) and 4 (decode) so chunk outputs concatenate
//! into exactly the single-shot result.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

use super::frame::{BinaryType, Blob, InboundKind, InboundMessage, MessageData, OutboundFrame, Payload, WireFrame};

// ============================================================================
// Constants
// ============================================================================

/// Raw bytes encoded per chunk.
pub const ENCODE_CHUNK_SIZE: usize = 3 * 8192;

/// Radix-64 characters decoded per chunk.
pub const DECODE_CHUNK_SIZE: usize = 4 * 8192;

// ============================================================================
// Radix-64
// ============================================================================

/// Encodes raw bytes as radix-64 text.
#[must_use]
pub fn encode_binary(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(ENCODE_CHUNK_SIZE) {
        STANDARD.encode_string(chunk, &mut out);
    }
    out
}

/// Decodes radix-64 text back into raw bytes.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the input is not well-formed padded base64.
pub fn decode_binary(text: &str) -> Result<Vec<u8>> {
    let input = text.as_bytes();
    if input.len() % 4 != 0 {
        return Err(Error::decode(format!(
            "radix-64 length {} is not a multiple of 4",
            input.len()
        )));
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut chunks = input.chunks(DECODE_CHUNK_SIZE).enumerate().peekable();

    while let Some((index, chunk)) = chunks.next() {
        // Padding may only terminate the final chunk
        if chunks.peek().is_some() && chunk.last() == Some(&b'=') {
            return Err(Error::decode(format!("padding inside chunk {index}")));
        }

        STANDARD
            .decode_vec(chunk, &mut out)
            .map_err(|e| Error::decode(format!("chunk {index}: {e}")))?;
    }

    Ok(out)
}

/// Decodes radix-64 text carrying UTF-8 bytes into a string.
///
/// # Errors
///
/// Returns [`Error::Decode`] on malformed base64 or invalid UTF-8.
pub fn decode_text(text: &str) -> Result<String> {
    let bytes = decode_binary(text)?;
    String::from_utf8(bytes).map_err(|e| Error::decode(format!("invalid UTF-8: {e}")))
}

// ============================================================================
// Frames
// ============================================================================

/// Encodes an outbound frame into its wire envelope.
#[must_use]
pub fn encode_frame(frame: &OutboundFrame) -> WireFrame {
    match frame.payload() {
        Payload::Text(text) => WireFrame::Text { data: text.clone() },
        Payload::Binary(bytes) => WireFrame::Binary {
            data: encode_binary(bytes),
        },
    }
}

/// Decodes an inbound text or binary message into message data.
///
/// Binary data is exposed according to `binary_type`.
///
/// # Errors
///
/// - [`Error::Decode`] if the body is malformed
/// - [`Error::Decode`] if the message is not a text or binary message
pub fn decode_message(message: &InboundMessage, binary_type: BinaryType) -> Result<MessageData> {
    let data = message.data.as_deref().unwrap_or_default();

    match message.kind {
        InboundKind::Text => decode_text(data).map(MessageData::Text),
        InboundKind::Binary => {
            let bytes = decode_binary(data)?;
            Ok(wrap_binary(bytes, binary_type))
        }
        InboundKind::Close | InboundKind::Unknown => Err(Error::decode(format!(
            "{:?} message carries no payload",
            message.kind
        ))),
    }
}

/// Exposes raw bytes in the representation selected by `binary_type`.
#[inline]
#[must_use]
pub fn wrap_binary(bytes: Vec<u8>, binary_type: BinaryType) -> MessageData {
    match binary_type {
        BinaryType::Blob => MessageData::Blob(Blob::new(bytes)),
        BinaryType::ArrayBuffer => MessageData::ArrayBuffer(bytes),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn inbound(kind: InboundKind, data: &str) -> InboundMessage {
        InboundMessage {
            kind,
            data: Some(data.to_string()),
            code: None,
            reason: None,
        }
    }

    #[test]
    fn test_encode_binary_matches_single_shot() {
        let bytes: Vec<u8> = (0..ENCODE_CHUNK_SIZE * 2 + 7).map(|i| (i % 251) as u8).collect();
        assert_eq!(encode_binary(&bytes), STANDARD.encode(&bytes));
    }

    #[test]
    fn test_empty_binary() {
        assert_eq!(encode_binary(&[]), "");
        assert!(decode_binary("").expect("decode").is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        let err = decode_binary("abc").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_bad_alphabet() {
        assert!(matches!(decode_binary("ab$d"), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_decode_rejects_padding_in_middle_chunk() {
        let mut text = "A".repeat(DECODE_CHUNK_SIZE - 2);
        text.push_str("==");
        text.push_str("AAAA");
        assert!(matches!(decode_binary(&text), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_decode_text_multibyte() {
        let encoded = STANDARD.encode("héllo ✓ 🦀".as_bytes());
        assert_eq!(decode_text(&encoded).expect("decode"), "héllo ✓ 🦀");
    }

    #[test]
    fn test_decode_text_invalid_utf8() {
        let encoded = STANDARD.encode([0xff, 0xfe]);
        assert!(matches!(decode_text(&encoded), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_encode_frame_text_is_raw() {
        let frame = OutboundFrame::new(Payload::from("hello"));
        assert_eq!(
            encode_frame(&frame),
            WireFrame::Text {
                data: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_encode_frame_binary_is_radix64() {
        let frame = OutboundFrame::new(Payload::from(vec![1u8, 2, 3]));
        assert_eq!(
            encode_frame(&frame),
            WireFrame::Binary {
                data: "AQID".to_string()
            }
        );
    }

    #[test]
    fn test_decode_message_binary_modes() {
        let msg = inbound(InboundKind::Binary, "AQID");

        match decode_message(&msg, BinaryType::ArrayBuffer).expect("decode") {
            MessageData::ArrayBuffer(bytes) => assert_eq!(bytes, vec![1, 2, 3]),
            other => panic!("unexpected {other:?}"),
        }

        match decode_message(&msg, BinaryType::Blob).expect("decode") {
            MessageData::Blob(blob) => assert_eq!(blob.as_bytes(), &[1, 2, 3]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_message_rejects_close() {
        let msg = inbound(InboundKind::Close, "");
        assert!(decode_message(&msg, BinaryType::Blob).is_err());
    }

    proptest! {
        #[test]
        fn prop_text_roundtrip(text in ".*") {
            let wire = encode_binary(text.as_bytes());
            prop_assert_eq!(decode_text(&wire).expect("decode"), text);
        }

        #[test]
        fn prop_binary_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..(ENCODE_CHUNK_SIZE * 2 + 5))) {
            let wire = encode_binary(&bytes);
            prop_assert_eq!(decode_binary(&wire).expect("decode"), bytes);
        }
    }
}
