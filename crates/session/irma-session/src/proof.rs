//! Proof artifacts as sent by a prover, and the attributes they disclose.

use crate::timestamp::Timestamp;
use irma_crypto::sha256;
use irma_revocation::SignedAccumulator;
use irma_types::{AttributeTypeIdentifier, Int, TranslatedString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position of the secret key in a credential's attribute list.
pub const SECRET_KEY_INDEX: u32 = 0;
/// Position of the metadata attribute.
pub const METADATA_INDEX: u32 = 1;
/// Position of the first attribute of the credential type.
pub const FIRST_ATTRIBUTE_INDEX: u32 = 2;

/// Disclosure proof over one credential.
///
/// Attributes are keyed by their position in the credential: the secret
/// key, then the metadata attribute, then the credential type's attributes
/// in order. Disclosed ones appear in `a_disclosed`, the others are proven
/// through `a_responses`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofD {
    pub c: Int,
    #[serde(rename = "A")]
    pub a: Int,
    pub e_response: Int,
    pub v_response: Int,
    pub a_responses: BTreeMap<u32, Int>,
    pub a_disclosed: BTreeMap<u32, Int>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonrev_proof: Option<NonRevocationProof>,
}

impl ProofD {
    /// The disclosed metadata attribute, which every proof must carry.
    pub fn metadata(&self) -> Option<&Int> {
        self.a_disclosed.get(&METADATA_INDEX)
    }

    /// Disclosed attribute values with their position in the credential
    /// type's attribute list.
    pub fn disclosed_attributes(&self) -> impl Iterator<Item = (usize, &Int)> {
        self.a_disclosed
            .range(FIRST_ATTRIBUTE_INDEX..)
            .map(|(i, v)| ((i - FIRST_ATTRIBUTE_INDEX) as usize, v))
    }
}

/// Proof that the credential is not revoked against a given accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonRevocationProof {
    #[serde(rename = "SignedAccumulator")]
    pub signed_accumulator: SignedAccumulator,
    /// Commitments and responses, interpreted by the proof system.
    #[serde(flatten)]
    pub responses: BTreeMap<String, Int>,
}

/// Which disclosed attribute answers a request item: credential `cred` in
/// the proof list, attribute position `attr` within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedAttributeIndex {
    pub cred: usize,
    pub attr: u32,
}

/// Per outer disjunction of the request, the disclosed attributes chosen.
pub type DisclosedAttributeIndices = Vec<Vec<DisclosedAttributeIndex>>;

/// Proofs answering a disclosure request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub proofs: Vec<ProofD>,
    #[serde(default)]
    pub indices: DisclosedAttributeIndices,
}

/// Proofs answering a signature request, bound to a message and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub signature: Vec<ProofD>,
    #[serde(default)]
    pub indices: DisclosedAttributeIndices,
    pub nonce: Int,
    pub context: Int,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl SignedMessage {
    pub fn disclosure(&self) -> Disclosure {
        Disclosure {
            proofs: self.signature.clone(),
            indices: self.indices.clone(),
        }
    }

    /// The nonce the proofs were actually computed over: the request nonce
    /// bound to the message and, if present, the timestamp signature.
    pub fn signature_nonce(&self) -> Int {
        signature_nonce(&self.nonce, &self.message, self.timestamp.as_ref())
    }
}

/// `SHA-256(nonce ‖ SHA-256(message) ‖ timestamp signature)`.
pub fn signature_nonce(nonce: &Int, message: &str, timestamp: Option<&Timestamp>) -> Int {
    let message_hash = sha256([message.as_bytes()]);
    let sig = timestamp.map(|t| t.sig.data.as_slice()).unwrap_or_default();
    let digest = sha256([nonce.to_bytes_be(), message_hash.as_bytes().as_slice(), sig]);
    Int::from_bytes_be(digest.as_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeProofStatus {
    /// Disclosed and requested.
    Present,
    /// Disclosed but not requested.
    Extra,
    /// Requested but not disclosed.
    Null,
}

/// An attribute as disclosed, after decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedAttribute {
    pub id: AttributeTypeIdentifier,
    #[serde(rename = "rawvalue")]
    pub raw_value: Option<String>,
    pub value: TranslatedString,
    pub status: AttributeProofStatus,
    #[serde(rename = "issuancetime")]
    pub issuance_time: irma_types::Timestamp,
}

impl DisclosedAttribute {
    /// Placeholder for a requested attribute that was not disclosed.
    pub fn null(id: AttributeTypeIdentifier) -> Self {
        Self {
            id,
            raw_value: None,
            value: TranslatedString::new(),
            status: AttributeProofStatus::Null,
            issuance_time: irma_types::Timestamp::from_unix(0),
        }
    }
}
