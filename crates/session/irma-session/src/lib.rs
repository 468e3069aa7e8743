//! IRMA Session – what verifiers ask for and how answers are checked.
//!
//! - Requests: disclosure, signature and issuance requests over a ConDisCon
//!   attribute tree, readable from both the current `@context`-tagged JSON
//!   and the legacy flat schema, and convertible back to the latter.
//! - Proof artifacts: disclosure proofs and signed messages as sent by a
//!   prover, with their optional timestamp.
//! - Verification: keys, revocation, expiry and request matching around a
//!   pluggable [`ProofVerifier`].

#![forbid(unsafe_code)]

pub mod condiscon;
pub mod error;
pub mod legacy;
pub mod proof;
pub mod request;
pub mod timestamp;
pub mod verify;

pub use condiscon::{AttributeCon, AttributeConDisCon, AttributeDisCon, AttributeRequest};
pub use error::{Result, SessionError};
pub use legacy::{
    Labels, LegacyAttributes, LegacyDisclosureRequest, LegacyIssuanceRequest,
    LegacyLabeledDisjunction, LegacySessionRequest, LegacySignatureRequest,
};
pub use proof::{
    AttributeProofStatus, DisclosedAttribute, DisclosedAttributeIndex, DisclosedAttributeIndices,
    Disclosure, NonRevocationProof, ProofD, SignedMessage,
};
pub use request::{
    BaseRequest, CredentialRequest, DisclosureRequest, IssuanceRequest, SessionRequest,
    SignatureRequest,
};
pub use timestamp::{Timestamp, TimestampError};
pub use verify::{ProofVerifier, VerifiedAttributes};
