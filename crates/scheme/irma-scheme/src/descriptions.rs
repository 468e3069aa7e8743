//! Description records of a scheme folder.
//!
//! Files on disk use local identifiers (`"id": "studentCard"`, `"issuer": "RU"`)
//! and the full dotted identifiers are derived from them.

use crate::error::SchemeManagerStatus;
use irma_crypto::{decode_verifying_key, CryptoError, VerifyingKey};
use irma_types::{
    AttributeTypeIdentifier, CredentialTypeIdentifier, Int, IssuerIdentifier,
    SchemeManagerIdentifier, TranslatedString,
};
use serde::{Deserialize, Serialize};

/// A time-stamping service trusted by a scheme manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampServer {
    pub url: String,
    /// Base64 Ed25519 verification key.
    pub public_key: String,
}

/// Root of a trust hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemeManager {
    pub id: String,
    pub name: TranslatedString,
    /// Where the signed scheme folder is distributed.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default)]
    pub timestamp_servers: Vec<TimestampServer>,

    #[serde(skip, default = "unprocessed")]
    pub status: SchemeManagerStatus,
    #[serde(skip)]
    pub valid: bool,
    /// Version of the scheme folder, in Unix seconds.
    #[serde(skip)]
    pub timestamp: Option<i64>,
}

fn unprocessed() -> SchemeManagerStatus {
    SchemeManagerStatus::Unprocessed
}

impl SchemeManager {
    /// Stand-in for a manager whose description could not be read, so that it
    /// stays visible with its failure status.
    pub(crate) fn placeholder(id: &SchemeManagerIdentifier) -> Self {
        Self {
            id: id.to_string(),
            name: TranslatedString::trivial(id.as_str()),
            url: String::new(),
            contact: None,
            timestamp_servers: Vec::new(),
            status: SchemeManagerStatus::Unprocessed,
            valid: false,
            timestamp: None,
        }
    }

    pub fn identifier(&self) -> SchemeManagerIdentifier {
        SchemeManagerIdentifier::new(self.id.as_str())
    }

    /// Whether this manager lists a timestamp server at `url` with `public_key`.
    pub fn trusts_timestamp_server(&self, url: &str, public_key: &str) -> bool {
        self.timestamp_servers
            .iter()
            .any(|s| s.url == url && s.public_key.trim() == public_key.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    pub id: String,
    pub scheme_manager: String,
    pub name: TranslatedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl Issuer {
    pub fn identifier(&self) -> IssuerIdentifier {
        IssuerIdentifier::new(format!("{}.{}", self.scheme_manager, self.id))
    }

    pub fn scheme_manager_identifier(&self) -> SchemeManagerIdentifier {
        SchemeManagerIdentifier::new(self.scheme_manager.as_str())
    }
}

/// One attribute as declared inside a credential type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescription {
    pub id: String,
    pub name: TranslatedString,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialType {
    pub id: String,
    pub issuer: String,
    pub scheme_manager: String,
    pub name: TranslatedString,
    pub short_name: TranslatedString,
    /// At most one valid instance per subject.
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub revocation: bool,
    /// Position used by the indexed metadata layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    pub attributes: Vec<AttributeDescription>,
}

impl CredentialType {
    pub fn identifier(&self) -> CredentialTypeIdentifier {
        CredentialTypeIdentifier::new(format!(
            "{}.{}.{}",
            self.scheme_manager, self.issuer, self.id
        ))
    }

    pub fn issuer_identifier(&self) -> IssuerIdentifier {
        IssuerIdentifier::new(format!("{}.{}", self.scheme_manager, self.issuer))
    }

    pub fn scheme_manager_identifier(&self) -> SchemeManagerIdentifier {
        SchemeManagerIdentifier::new(self.scheme_manager.as_str())
    }

    pub fn attribute_identifier(&self, attribute: &AttributeDescription) -> AttributeTypeIdentifier {
        AttributeTypeIdentifier::new(format!("{}.{}", self.identifier(), attribute.id))
    }

    /// Attribute identifiers in credential order.
    pub fn attribute_identifiers(&self) -> Vec<AttributeTypeIdentifier> {
        self.attributes
            .iter()
            .map(|a| self.attribute_identifier(a))
            .collect()
    }

    /// Position of an attribute within the credential, not counting the
    /// secret key and metadata attributes.
    pub fn index_of(&self, attribute: &AttributeTypeIdentifier) -> Option<usize> {
        if attribute.credential_type() != self.identifier() {
            return None;
        }
        self.attributes.iter().position(|a| a.id == attribute.name())
    }

    pub fn contains_attribute(&self, attribute: &AttributeTypeIdentifier) -> bool {
        self.index_of(attribute).is_some()
    }
}

/// An attribute type, derived from its credential type at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    pub identifier: AttributeTypeIdentifier,
    pub name: TranslatedString,
    pub optional: bool,
    /// Position within the credential type's attribute list.
    pub index: usize,
}

/// Issuer public key. The group parameters are only meaningful to the proof
/// system; the configuration stores and indexes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub counter: u32,
    /// Unix seconds after which no new credentials may be issued.
    pub expiry_date: i64,
    pub n: Int,
    pub z: Int,
    pub s: Int,
    pub r: Vec<Int>,
    /// Base64 Ed25519 key signing this issuer's revocation accumulators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_key: Option<String>,
}

impl PublicKey {
    pub fn supports_revocation(&self) -> bool {
        self.revocation_key.is_some()
    }

    pub fn revocation_verifying_key(&self) -> Option<Result<VerifyingKey, CryptoError>> {
        self.revocation_key.as_deref().map(decode_verifying_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student_card() -> CredentialType {
        serde_json::from_str(
            r#"{
                "id": "studentCard", "issuer": "RU", "scheme_manager": "irma-demo",
                "name": {"en": "Student Card"}, "short_name": {"en": "Card"},
                "attributes": [
                    {"id": "university", "name": {"en": "University"}},
                    {"id": "studentID", "name": {"en": "Student ID"}, "optional": true}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn derives_identifiers() {
        let ct = student_card();
        assert_eq!(ct.identifier().as_str(), "irma-demo.RU.studentCard");
        assert_eq!(ct.issuer_identifier().as_str(), "irma-demo.RU");
        assert!(!ct.singleton);
        assert!(ct.attributes[1].optional);

        let id = AttributeTypeIdentifier::new("irma-demo.RU.studentCard.studentID");
        assert_eq!(ct.index_of(&id), Some(1));
        let foreign = AttributeTypeIdentifier::new("irma-demo.RU.otherCard.studentID");
        assert!(!ct.contains_attribute(&foreign));
    }

    #[test]
    fn manager_status_is_not_read_from_disk() {
        let manager: SchemeManager = serde_json::from_str(
            r#"{"id": "test", "name": {"en": "Test"}, "url": "https://example.org/test"}"#,
        )
        .unwrap();
        assert_eq!(manager.status, SchemeManagerStatus::Unprocessed);
        assert!(!manager.valid);
        assert!(manager.timestamp_servers.is_empty());
    }
}
