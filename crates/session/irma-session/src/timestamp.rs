//! Timestamps binding a signed message to a moment in time.
//!
//! A timestamp server signs the current time together with a digest of the
//! message and the proofs' commitments. Verifiers only accept servers listed
//! by a trusted scheme manager, and evaluate credential expiry at the
//! timestamped moment instead of the verification time.

use crate::proof::ProofD;
use irma_crypto::{decode_verifying_key, sha256, sign_raw, verify_raw, CryptoError, SigningKey};
use irma_crypto::{encode_verifying_key, Digest256};
use irma_scheme::Configuration;
use irma_types::encoding::base64_bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TIMESTAMP_ALGORITHM: &str = "ed25519";

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("unsupported timestamp signature algorithm {0:?}")]
    UnsupportedAlgorithm(String),

    #[error("timestamp server {0} is not trusted by any scheme manager")]
    UntrustedServer(String),

    #[error("invalid timestamp server key: {0}")]
    InvalidKey(#[source] CryptoError),

    #[error("timestamp signature does not verify: {0}")]
    InvalidSignature(#[source] CryptoError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampSignature {
    #[serde(rename = "Alg")]
    pub alg: String,
    #[serde(rename = "Data", with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(rename = "PublicKey")]
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Unix seconds.
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "ServerUrl")]
    pub server_url: String,
    #[serde(rename = "Sig")]
    pub sig: TimestampSignature,
}

/// Digest of what a timestamp attests: the message, each proof's `A`, and
/// every disclosed value, each length-prefixed.
pub fn timestamp_digest(message: &str, proofs: &[ProofD]) -> Digest256 {
    let mut buf = Vec::new();
    let mut push = |bytes: &[u8]| {
        buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(bytes);
    };
    push(message.as_bytes());
    for proof in proofs {
        push(proof.a.to_bytes_be());
    }
    for proof in proofs {
        for value in proof.a_disclosed.values() {
            push(value.to_bytes_be());
        }
    }
    sha256([buf])
}

fn signed_payload(time: i64, digest: &Digest256) -> Vec<u8> {
    let mut payload = time.to_be_bytes().to_vec();
    payload.extend_from_slice(digest.as_bytes());
    payload
}

impl Timestamp {
    /// Produce a timestamp as a server holding `key` would.
    pub fn sign(
        time: i64,
        server_url: impl Into<String>,
        key: &SigningKey,
        message: &str,
        proofs: &[ProofD],
    ) -> Self {
        let payload = signed_payload(time, &timestamp_digest(message, proofs));
        Self {
            time,
            server_url: server_url.into(),
            sig: TimestampSignature {
                alg: TIMESTAMP_ALGORITHM.to_string(),
                data: sign_raw(&payload, key),
                public_key: encode_verifying_key(&key.verifying_key()),
            },
        }
    }

    pub fn time(&self) -> irma_types::Timestamp {
        irma_types::Timestamp::from_unix(self.time)
    }

    /// Check that a trusted server signed this time over `message` and
    /// `proofs`.
    pub fn verify(
        &self,
        conf: &Configuration,
        message: &str,
        proofs: &[ProofD],
    ) -> Result<(), TimestampError> {
        if !self.sig.alg.eq_ignore_ascii_case(TIMESTAMP_ALGORITHM) {
            return Err(TimestampError::UnsupportedAlgorithm(self.sig.alg.clone()));
        }
        let trusted = conf
            .scheme_managers()
            .values()
            .any(|m| m.trusts_timestamp_server(&self.server_url, &self.sig.public_key));
        if !trusted {
            return Err(TimestampError::UntrustedServer(self.server_url.clone()));
        }
        let key = decode_verifying_key(&self.sig.public_key).map_err(TimestampError::InvalidKey)?;
        let payload = signed_payload(self.time, &timestamp_digest(message, proofs));
        verify_raw(&payload, &self.sig.data, &key).map_err(TimestampError::InvalidSignature)
    }
}
