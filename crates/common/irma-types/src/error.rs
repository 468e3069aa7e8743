use thiserror::Error;

/// Errors raised while parsing or decoding shared types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid identifier {identifier:?}: expected {expected} dot-separated parts")]
    InvalidIdentifier { identifier: String, expected: usize },

    #[error("invalid decimal integer: {0:?}")]
    InvalidDecimal(String),

    #[error("base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),
}
