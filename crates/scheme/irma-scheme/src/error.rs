use crate::fetcher::FetchError;
use irma_revocation::RevocationError;
use irma_types::{CredentialTypeIdentifier, IssuerIdentifier, SchemeManagerIdentifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Trust status of a scheme manager after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemeManagerStatus {
    Valid,
    Unprocessed,
    InvalidIndex,
    InvalidSignature,
    ParsingError,
    ContentParsingError,
}

impl fmt::Display for SchemeManagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemeManagerStatus::Valid => "VALID",
            SchemeManagerStatus::Unprocessed => "UNPROCESSED",
            SchemeManagerStatus::InvalidIndex => "INVALID_INDEX",
            SchemeManagerStatus::InvalidSignature => "INVALID_SIGNATURE",
            SchemeManagerStatus::ParsingError => "PARSING_ERROR",
            SchemeManagerStatus::ContentParsingError => "CONTENT_PARSING_ERROR",
        };
        f.write_str(s)
    }
}

/// Why a scheme manager was disabled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scheme manager {manager} is {status}: {reason}")]
pub struct SchemeManagerError {
    pub manager: SchemeManagerIdentifier,
    pub status: SchemeManagerStatus,
    pub reason: String,
}

impl SchemeManagerError {
    pub(crate) fn new(
        manager: &SchemeManagerIdentifier,
        status: SchemeManagerStatus,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            manager: manager.clone(),
            status,
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by the configuration store.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    SchemeManager(#[from] SchemeManagerError),

    #[error("unknown scheme manager: {0}")]
    UnknownSchemeManager(SchemeManagerIdentifier),

    #[error("unknown issuer: {0}")]
    UnknownIssuer(IssuerIdentifier),

    #[error("unknown credential type: {0}")]
    UnknownCredentialType(CredentialTypeIdentifier),

    #[error("public key {counter} of issuer {issuer} not found")]
    UnknownPublicKey { issuer: IssuerIdentifier, counter: u32 },

    #[error("public key {counter} of issuer {issuer} has no revocation key")]
    NoRevocationKey { issuer: IssuerIdentifier, counter: u32 },

    #[error("no recovery source for scheme manager {0}")]
    NoRecoverySource(SchemeManagerIdentifier),

    #[error("configuration is read-only")]
    ReadOnly,

    #[error("revocation error: {0}")]
    Revocation(#[from] RevocationError),

    #[error("remote scheme error: {0}")]
    Remote(#[from] FetchError),

    #[error("invalid options: {0}")]
    Options(#[from] toml::de::Error),
}

impl ConfigurationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigurationError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigurationError>;
