//! Payload and wire envelope types.
//!
//! # Wire Format
//!
//! Outbound frame envelope (submitted one at a time):
//!
//! ```json
//! { "type": "text",   "data": "<utf8 string>" }
//! { "type": "binary", "data": "<radix-64 text>" }
//! { "type": "close",  "code": 1000, "reason": "bye" }
//! ```
//!
//! Inbound message (returned in batches by poll):
//!
//! ```json
//! { "type": "text" | "binary" | "close", "data": "<radix-64 text>", "code": 1000, "reason": "" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

// ============================================================================
// BinaryType
// ============================================================================

/// Representation of inbound binary payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BinaryType {
    /// Immutable blob-like value.
    #[default]
    Blob,
    /// Raw byte buffer.
    ArrayBuffer,
}

impl BinaryType {
    /// Returns the canonical name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::ArrayBuffer => "arraybuffer",
        }
    }
}

/// Unrecognized names normalize to the default.
impl From<&str> for BinaryType {
    fn from(name: &str) -> Self {
        match name {
            "arraybuffer" => Self::ArrayBuffer,
            _ => Self::Blob,
        }
    }
}

impl fmt::Display for BinaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Blob
// ============================================================================

/// Immutable binary value delivered in [`BinaryType::Blob`] mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    /// Creates a blob from raw bytes.
    #[inline]
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns the blob size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the blob contents.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the blob, returning its bytes.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

// ============================================================================
// MessageData
// ============================================================================

/// Payload of a delivered message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageData {
    /// Text message.
    Text(String),
    /// Binary message in blob mode.
    Blob(Blob),
    /// Binary message in raw-buffer mode.
    ArrayBuffer(Vec<u8>),
}

impl MessageData {
    /// Returns the text, if this is a text message.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a binary message in either mode.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Blob(blob) => Some(blob.as_bytes()),
            Self::ArrayBuffer(bytes) => Some(bytes),
        }
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Application payload accepted by `send()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the byte size counted against the buffered amount.
    ///
    /// UTF-8 byte length for text, byte length for binary.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<Blob> for Payload {
    fn from(blob: Blob) -> Self {
        Self::Binary(blob.into_bytes())
    }
}

/// Dynamic payloads: strings become text, arrays of byte values become
/// binary. Anything else is rejected.
impl TryFrom<Value> for Payload {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| Error::unsupported_payload(format!("array element {item}")))
                })
                .collect::<Result<Vec<u8>>>()
                .map(Self::Binary),
            Value::Null => Err(Error::unsupported_payload("null")),
            Value::Bool(_) => Err(Error::unsupported_payload("boolean")),
            Value::Number(_) => Err(Error::unsupported_payload("number")),
            Value::Object(_) => Err(Error::unsupported_payload("object")),
        }
    }
}

// ============================================================================
// OutboundFrame
// ============================================================================

/// One payload accepted by `send()` and waiting to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    payload: Payload,
    size: usize,
}

impl OutboundFrame {
    /// Creates a frame, computing its byte size.
    #[inline]
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        let size = payload.size();
        Self { payload, size }
    }

    /// Returns the payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the byte size.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

// ============================================================================
// WireFrame
// ============================================================================

/// Tagged envelope submitted to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireFrame {
    /// Text frame, UTF-8 string as-is.
    Text {
        /// Message text.
        data: String,
    },
    /// Binary frame, radix-64 encoded.
    Binary {
        /// Radix-64 body.
        data: String,
    },
    /// Close notification.
    Close {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

impl WireFrame {
    /// Creates a close envelope.
    #[inline]
    #[must_use]
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        Self::Close {
            code,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// Inbound message kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundKind {
    /// Text message.
    Text,
    /// Binary message.
    Binary,
    /// Remote close notification.
    Close,
    /// Anything this client does not recognize.
    #[serde(other)]
    Unknown,
}

/// One item of a poll result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: InboundKind,

    /// Radix-64 body (text and binary).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Close code (close notifications).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    /// Close reason (close notifications).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl InboundMessage {
    /// Creates a close notification.
    #[must_use]
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        Self {
            kind: InboundKind::Close,
            data: None,
            code: Some(code),
            reason: Some(reason.into()),
        }
    }

    /// Creates a data message with a radix-64 body.
    #[must_use]
    pub fn data(kind: InboundKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: Some(data.into()),
            code: None,
            reason: None,
        }
    }
}

// ============================================================================
// Open / Poll envelopes
// ============================================================================

/// Body of the open request.
#[derive(Debug, Clone, Serialize)]
pub struct OpenRequest {
    /// Target address.
    pub url: String,
    /// Requested sub-protocols.
    pub protocols: Vec<String>,
}

/// Result of a successful open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenResponse {
    /// Opaque connection identifier.
    #[serde(rename = "connectionId", alias = "id")]
    pub connection_id: ConnectionId,

    /// Negotiated sub-protocol, empty when none.
    #[serde(default)]
    pub protocol: String,
}

impl OpenResponse {
    /// Creates an open response.
    #[inline]
    #[must_use]
    pub fn new(connection_id: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            connection_id: ConnectionId::new(connection_id),
            protocol: protocol.into(),
        }
    }
}

/// Result of a poll.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollResponse {
    /// Pending inbound messages in arrival order.
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

// ============================================================================
// Tests
// ============================================================================
