use irma_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur while decoding or verifying revocation data.
#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("accumulator signature verification failed: {0}")]
    Signature(#[from] CryptoError),

    #[error("accumulator serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("event {found} does not follow event {previous}")]
    NonContiguous { previous: u64, found: u64 },

    #[error("event {index} does not reference the hash of its parent")]
    BrokenChain { index: u64 },

    #[error("last event {event_index} does not match accumulator {accumulator_index}")]
    AccumulatorMismatch {
        event_index: u64,
        accumulator_index: u64,
    },
}
