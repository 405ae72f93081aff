//! Error types for the codec and the traversal op-processor

use thiserror::Error;

use crate::io::DataType;
use crate::server::message::ResponseStatusCode;

pub type Result<T> = std::result::Result<T, CodecError>;

/// Failures at the binary codec boundary.
///
/// Every variant is fatal to the message being decoded; the codec never
/// attempts partial recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Buffer underflow: needed {needed} bytes, {remaining} remaining")]
    BufferUnderflow { needed: usize, remaining: usize },

    #[error("Unknown type code: 0x{0:02x}")]
    UnknownTypeCode(u8),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),
}

impl CodecError {
    pub(crate) fn mismatch(expected: DataType, found: &crate::io::Value) -> Self {
        CodecError::Encode(format!(
            "{:?} serializer cannot write a {:?} value",
            expected,
            found.data_type()
        ))
    }
}

/// Failure reported by an external collaborator (graph, traversal, script engine).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TraversalError {
    pub message: String,
}

impl TraversalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A request rejected during op selection.
///
/// Carries the status code the client receives; nothing has been submitted
/// for execution and the side-effect cache has not been touched.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct OpProcessorError {
    pub message: String,
    pub code: ResponseStatusCode,
}

impl OpProcessorError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: ResponseStatusCode::RequestErrorInvalidRequestArguments }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: ResponseStatusCode::RequestErrorMalformedRequest }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: ResponseStatusCode::ServerErrorSerialization }
    }
}

/// Settings could not be read or contain invalid values.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setting '{key}': {reason}")]
    Invalid { key: String, reason: String },
}
