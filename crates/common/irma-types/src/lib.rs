//! IRMA Types – identifiers and wire encodings shared across the workspace.
//!
//! - Dot-separated identifiers for scheme managers, issuers, credential types
//!   and attribute types (`irma-demo.RU.studentCard.studentID`).
//! - `Int`, a big-endian arbitrary-size integer that travels as base64.
//! - `TranslatedString` for localized names and labels.
//! - `ProofStatus`, the semantic outcome of proof verification.
//! - `Timestamp`, a UTC instant that travels as Unix seconds.

#![forbid(unsafe_code)]

pub mod encoding;
pub mod error;
pub mod identifier;
pub mod int;
pub mod status;
pub mod time;
pub mod translated;

pub use error::TypesError;
pub use identifier::{
    AttributeTypeIdentifier, CredentialTypeIdentifier, IssuerIdentifier, SchemeManagerIdentifier,
};
pub use int::Int;
pub use status::ProofStatus;
pub use time::Timestamp;
pub use translated::TranslatedString;
