use irma_scheme::{ConfigurationError, MetadataError};
use irma_types::{AttributeTypeIdentifier, CredentialTypeIdentifier};
use thiserror::Error;

/// Errors raised while decoding, validating or verifying session data.
///
/// Proof verification outcomes are reported as a
/// [`ProofStatus`](irma_types::ProofStatus), not through this type; these
/// are faults of the input or the environment.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized request: {0}")]
    UnrecognizedRequest(String),

    #[error("request has no attributes to disclose")]
    EmptyDisclosure,

    #[error("signature request has an empty message")]
    EmptyMessage,

    #[error("issuance request has no credentials")]
    NoCredentials,

    #[error("disjunction {0} has a conjunction over more than one non-singleton credential type")]
    MultipleNonSingletons(usize),

    #[error("unknown credential type: {0}")]
    UnknownCredentialType(CredentialTypeIdentifier),

    #[error("unknown attribute type: {0}")]
    UnknownAttributeType(AttributeTypeIdentifier),

    #[error("credential {credential} is missing required attribute {attribute}")]
    MissingAttribute {
        credential: CredentialTypeIdentifier,
        attribute: String,
    },

    #[error("credential {credential} has no attribute {attribute}")]
    UnknownAttribute {
        credential: CredentialTypeIdentifier,
        attribute: String,
    },

    #[error("request cannot be expressed in the legacy format: {0}")]
    InexpressibleLegacy(String),

    #[error("proof references an unknown credential type ({0})")]
    UnresolvedCredentialType(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
