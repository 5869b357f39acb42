use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid schema uri {uri:?}: {reason}")]
    InvalidSchemaUri { uri: String, reason: String },

    #[error("invalid handle {0:?}")]
    InvalidHandle(String),
}

/// Errors produced while turning a document into bytes or back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}
