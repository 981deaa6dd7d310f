//! Wire codec: [`Error`] to and from a flat, transport-safe record.
//!
//! # What Crosses the Wire
//!
//! | Field | Encode | Decode |
//! |---|---|---|
//! | `code` | `unknown` when empty | `unknown` when empty |
//! | `message`, `messageChain` | copied | copied |
//! | `params` | copied when present | empty map when absent |
//! | `stack` | filename, line, method (no address) | address 0 |
//! | `retryable`, `unexpected` | only when explicitly set | only when present |
//! | `marshalCount` | `+1` | verbatim |
//!
//! The cause never crosses. Its messages already live in the message chain,
//! which is what a receiver gets instead. The other loss is the difference
//! between absent and empty params.
//!
//! # JSON Shape
//!
//! ```json
//! {
//!   "code": "timeout.ledger",
//!   "message": "ledger did not answer",
//!   "params": { "shard": "7" },
//!   "stack": [{ "filename": "ledger.rs", "line": 88, "method": "ledger::post" }],
//!   "retryable": false,
//!   "marshalCount": 1,
//!   "messageChain": ["connection reset"]
//! }
//! ```
//!
//! Unset flags, absent params and empty sequences are left out on encode and
//! defaulted on decode.

use crate::{Error, Frame, Params, codes};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

/// Message of the record produced for a missing error.
pub const NIL_MARSHALLED_MESSAGE: &str = "Unknown error, nil error marshalled";

/// Message of the error produced from a missing record.
pub const NIL_UNMARSHALLED_MESSAGE: &str = "Nil error unmarshalled!";

// ============================================================================
// Wire Types
// ============================================================================

/// One stack frame as sent over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFrame {
    /// Source file.
    #[serde(default)]
    pub filename: String,
    /// Line within `filename`.
    #[serde(default)]
    pub line: u32,
    /// Symbol path.
    #[serde(default)]
    pub method: String,
}

/// The flat transport record for an [`Error`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireError {
    /// Dot-delimited code, never empty after [`marshal`].
    #[serde(default)]
    pub code: String,
    /// The error's own message.
    #[serde(default)]
    pub message: String,
    /// Params, when the sender had any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Frames captured by the sender.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<WireFrame>,
    /// Explicit retryable flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    /// Explicit unexpected flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unexpected: Option<bool>,
    /// Number of encodes this error has been through, this one included.
    #[serde(default)]
    pub marshal_count: u32,
    /// Messages of the errors the sender's error wrapped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_chain: Vec<String>,
}

// ============================================================================
// Codec Errors
// ============================================================================

/// Failure of the JSON transport helpers.
#[derive(Debug)]
pub enum CodecError {
    /// The record could not be serialized.
    Encode(serde_json::Error),
    /// The input was not a valid record.
    Decode(serde_json::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "failed to encode error record: {err}"),
            Self::Decode(err) => write!(f, "failed to decode error record: {err}"),
        }
    }
}

impl StdError for CodecError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Encode(err) | Self::Decode(err) => Some(err),
        }
    }
}

impl WireError {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }

    /// Serialize to JSON bytes.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::Encode)
    }

    /// Parse a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        serde_json::from_str(json).map_err(CodecError::Decode)
    }

    /// Parse JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::Decode)
    }
}

// ============================================================================
// Encode / Decode
// ============================================================================

fn code_or_unknown(code: &str) -> String {
    if code.is_empty() {
        codes::UNKNOWN.to_owned()
    } else {
        code.to_owned()
    }
}

/// Encode an error for transmission.
///
/// `None` encodes as an `unknown` record that says so. Otherwise the hop
/// counter is one higher than the error's own.
///
/// ```rust
/// use relay_errors::{Error, marshal};
///
/// let record = marshal(Some(&Error::forbidden("", "NO. FORBIDDEN", None)));
/// assert_eq!(record.code, "forbidden");
/// assert_eq!(record.retryable, None);
/// assert_eq!(record.marshal_count, 1);
///
/// assert_eq!(marshal(None).code, "unknown");
/// ```
pub fn marshal(err: Option<&Error>) -> WireError {
    let Some(err) = err else {
        return WireError {
            code: codes::UNKNOWN.to_owned(),
            message: NIL_MARSHALLED_MESSAGE.to_owned(),
            ..WireError::default()
        };
    };

    WireError {
        code: code_or_unknown(&err.code),
        message: err.message.clone(),
        params: err.params().cloned(),
        stack: err.stack.iter().map(WireFrame::from).collect(),
        retryable: err.is_retryable,
        unexpected: err.is_unexpected,
        marshal_count: err.marshal_count.saturating_add(1),
        message_chain: err.message_chain.clone(),
    }
}

/// Decode a received record.
///
/// The result has no cause and always has params. `None` decodes as an
/// `unknown` error that says so.
pub fn unmarshal(record: Option<&WireError>) -> Error {
    let Some(record) = record else {
        return Error::builder()
            .code(codes::UNKNOWN)
            .message(NIL_UNMARSHALLED_MESSAGE)
            .params(Params::new())
            .build();
    };

    let mut builder = Error::builder()
        .code(code_or_unknown(&record.code))
        .message(record.message.clone())
        .params(record.params.clone().unwrap_or_default())
        .frames(record.stack.iter().map(Frame::from).collect())
        .marshal_count(record.marshal_count)
        .message_chain(record.message_chain.iter().cloned());

    if let Some(retryable) = record.retryable {
        builder = builder.retryable(retryable);
    }
    if let Some(unexpected) = record.unexpected {
        builder = builder.unexpected(unexpected);
    }
    builder.build()
}

impl From<&Frame> for WireFrame {
    fn from(frame: &Frame) -> Self {
        Self {
            filename: frame.filename.clone(),
            line: frame.line,
            method: frame.method.clone(),
        }
    }
}

impl From<&WireFrame> for Frame {
    fn from(frame: &WireFrame) -> Self {
        Frame::new(frame.filename.clone(), frame.line, frame.method.clone())
    }
}

impl From<&Error> for WireError {
    fn from(err: &Error) -> Self {
        marshal(Some(err))
    }
}

impl From<&WireError> for Error {
    fn from(record: &WireError) -> Self {
        unmarshal(Some(record))
    }
}

impl From<WireError> for Error {
    fn from(record: WireError) -> Self {
        unmarshal(Some(&record))
    }
}
