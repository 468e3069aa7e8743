//! IRMA Scheme – the signed configuration store that anchors trust.
//!
//! A scheme folder holds one directory per scheme manager. Each manager
//! directory is covered by a signed `index`; only managers whose index
//! verifies against their `pk` contribute issuers, credential types and
//! public keys to the [`Configuration`]. Managers that fail are disabled and
//! can be restored from their remote URL or from a read-only assets folder.
//!
//! The crate also carries the metadata attribute codec, which needs the
//! configuration to resolve credential types.

#![forbid(unsafe_code)]

pub mod attribute;
pub mod configuration;
pub mod descriptions;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod metadata;
pub mod options;

mod fs;
mod manager;
mod recovery;

pub use attribute::{decode_attribute, encode_attribute};
pub use configuration::Configuration;
pub use descriptions::{
    AttributeDescription, AttributeType, CredentialType, Issuer, PublicKey, SchemeManager,
    TimestampServer,
};
pub use error::{ConfigurationError, Result, SchemeManagerError, SchemeManagerStatus};
pub use fetcher::{FetchError, HttpSchemeFetcher, SchemeFetcher};
pub use metadata::{
    credential_type_hash, CredentialTypeReference, MetadataAttribute, MetadataError,
    MetadataLayout, CURRENT_METADATA_VERSION, DEFAULT_VALIDITY_WEEKS, EXPIRY_FACTOR,
};
pub use options::ConfigurationOptions;
