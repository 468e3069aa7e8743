//! IRMA Revocation – accumulator bookkeeping for revocable credentials.
//!
//! - `SignedAccumulator`: the issuer-signed current revocation state of one
//!   (credential type, key counter) pair.
//! - `Event`: one revocation, hash-chained to its parent.
//! - `Update`: a signed accumulator plus the contiguous events leading to it.
//! - `RevocationStorage`: per-chain latest accumulator and a rolling event log.
//!
//! The accumulator arithmetic itself is performed by the proof system; this
//! crate only checks signatures, chain structure and ordering.

#![forbid(unsafe_code)]

mod accumulator;
mod error;
mod event;
mod store;
mod update;

pub use accumulator::{Accumulator, SignedAccumulator};
pub use error::RevocationError;
pub use event::Event;
pub use store::{RevocationStorage, DEFAULT_MAX_EVENTS};
pub use update::Update;

/// Result type for revocation operations
pub type Result<T> = std::result::Result<T, RevocationError>;
