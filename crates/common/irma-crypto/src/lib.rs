//! IRMA Crypto – the signature and digest primitives that anchor trust.
//!
//! Scheme indices, revocation accumulators and timestamps are all signed with
//! Ed25519 and carried as standard base64. Zero-knowledge proof arithmetic is
//! not in here; it belongs to the proof system plugged into verification.

#![forbid(unsafe_code)]

pub mod digest;
pub mod signing;

pub use digest::{sha256, Digest256};
pub use ed25519_dalek::{SigningKey, VerifyingKey};
pub use signing::{
    decode_signing_key, decode_verifying_key, encode_verifying_key, sign_detached, sign_raw,
    verify_detached, verify_raw, CryptoError,
};
