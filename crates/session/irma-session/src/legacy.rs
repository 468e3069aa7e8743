//! The legacy request schema.
//!
//! Before `@context`-tagged requests, the attributes to disclose were a flat
//! list of labeled disjunctions. Each entry's `attributes` is either a list
//! of identifiers (any one of them) or an identifier-to-value object (all of
//! them, with the given values). Object order is significant and preserved.

use crate::condiscon::{AttributeCon, AttributeConDisCon, AttributeDisCon, AttributeRequest};
use crate::error::{Result, SessionError};
use crate::request::CredentialRequest;
use irma_types::{AttributeTypeIdentifier, Int, TranslatedString};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub const LEGACY_DISCLOSING: &str = "disclosing";
pub const LEGACY_SIGNING: &str = "signing";
pub const LEGACY_ISSUING: &str = "issuing";

/// Labels of the outer disjunctions, by position.
pub type Labels = BTreeMap<usize, Option<TranslatedString>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyLabeledDisjunction {
    pub label: String,
    pub attributes: LegacyAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyAttributes {
    /// Any one of these attributes.
    Any(Vec<AttributeTypeIdentifier>),
    /// All of these attributes, each with an optional required value.
    All(Vec<(AttributeTypeIdentifier, Option<String>)>),
}

impl Serialize for LegacyAttributes {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            LegacyAttributes::Any(ids) => {
                let mut seq = serializer.serialize_seq(Some(ids.len()))?;
                for id in ids {
                    seq.serialize_element(id)?;
                }
                seq.end()
            }
            LegacyAttributes::All(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (id, value) in entries {
                    map.serialize_entry(id, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for LegacyAttributes {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LegacyAttributesVisitor;

        impl<'de> Visitor<'de> for LegacyAttributesVisitor {
            type Value = LegacyAttributes;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a list of attribute identifiers or an identifier-to-value map")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut ids = Vec::new();
                while let Some(id) = seq.next_element()? {
                    ids.push(id);
                }
                Ok(LegacyAttributes::Any(ids))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(AttributeTypeIdentifier, Option<String>)> = Vec::new();
                while let Some((id, value)) = map.next_entry()? {
                    if entries.iter().any(|(seen, _)| *seen == id) {
                        return Err(de::Error::custom(format!("duplicate attribute {id}")));
                    }
                    entries.push((id, value));
                }
                Ok(LegacyAttributes::All(entries))
            }
        }

        deserializer.deserialize_any(LegacyAttributesVisitor)
    }
}

/// Lift a legacy attribute list into a ConDisCon and its labels. Disjunctions
/// with an empty label get no label entry.
pub(crate) fn from_legacy(content: Vec<LegacyLabeledDisjunction>) -> (AttributeConDisCon, Labels) {
    let mut disclose = AttributeConDisCon::default();
    let mut labels = Labels::new();
    for (i, disjunction) in content.into_iter().enumerate() {
        let discon: AttributeDisCon = match disjunction.attributes {
            LegacyAttributes::Any(ids) => ids
                .into_iter()
                .map(|id| AttributeCon(vec![AttributeRequest::new(id)]))
                .collect(),
            LegacyAttributes::All(entries) => {
                let con: AttributeCon = entries
                    .into_iter()
                    .map(|(id, value)| AttributeRequest {
                        attribute_type: id,
                        value,
                        not_null: false,
                    })
                    .collect();
                AttributeDisCon(vec![con])
            }
        };
        disclose.push(discon);
        // an empty legacy label is an absent one
        if !disjunction.label.is_empty() {
            labels.insert(i, Some(TranslatedString::trivial(disjunction.label)));
        }
    }
    (disclose, labels)
}

/// Flatten a ConDisCon into the legacy list.
///
/// A disjunction of single, unconstrained attributes becomes a list; a
/// disjunction with exactly one conjunction becomes a map. Anything else,
/// and `notNull` requests, cannot be expressed.
pub(crate) fn to_legacy(
    disclose: &AttributeConDisCon,
    labels: &Labels,
) -> Result<Vec<LegacyLabeledDisjunction>> {
    let mut content = Vec::with_capacity(disclose.len());
    for (i, discon) in disclose.iter().enumerate() {
        if discon.iter().flat_map(|con| con.iter()).any(|r| r.not_null) {
            return Err(SessionError::InexpressibleLegacy(format!(
                "disjunction {i} uses notNull"
            )));
        }
        let simple = discon
            .iter()
            .all(|con| con.len() == 1 && con[0].value.is_none());
        let attributes = if simple && !discon.is_empty() {
            LegacyAttributes::Any(discon.iter().map(|con| con[0].attribute_type.clone()).collect())
        } else if discon.len() == 1 {
            LegacyAttributes::All(
                discon[0]
                    .iter()
                    .map(|r| (r.attribute_type.clone(), r.value.clone()))
                    .collect(),
            )
        } else {
            return Err(SessionError::InexpressibleLegacy(format!(
                "disjunction {i} has several multi-attribute alternatives"
            )));
        };
        let label = labels
            .get(&i)
            .and_then(Option::as_ref)
            .and_then(TranslatedString::preferred)
            .unwrap_or_default()
            .to_string();
        content.push(LegacyLabeledDisjunction { label, attributes });
    }
    Ok(content)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyDisclosureRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Int>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Int>,
    pub content: Vec<LegacyLabeledDisjunction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySignatureRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Int>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Int>,
    pub message: String,
    pub content: Vec<LegacyLabeledDisjunction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyIssuanceRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Int>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Int>,
    pub credentials: Vec<CredentialRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disclose: Vec<LegacyLabeledDisjunction>,
}

/// Any request in the legacy schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LegacySessionRequest {
    Disclosure(LegacyDisclosureRequest),
    Signature(LegacySignatureRequest),
    Issuance(LegacyIssuanceRequest),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_order_is_preserved() {
        let json = r#"{"irma-demo.MijnOverheid.fullName.familyname": null,
                       "irma-demo.MijnOverheid.fullName.firstname": "hello"}"#;
        let attrs: LegacyAttributes = serde_json::from_str(json).unwrap();
        let LegacyAttributes::All(entries) = &attrs else {
            panic!("expected a map, got {attrs:?}");
        };
        assert_eq!(entries[0].0.name(), "familyname");
        assert_eq!(entries[0].1, None);
        assert_eq!(entries[1].1.as_deref(), Some("hello"));

        let out = serde_json::to_string(&attrs).unwrap();
        assert!(out.find("familyname").unwrap() < out.find("firstname").unwrap());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let json = r#"{"irma-demo.RU.studentCard.level": "1", "irma-demo.RU.studentCard.level": "2"}"#;
        assert!(serde_json::from_str::<LegacyAttributes>(json).is_err());
    }

    #[test]
    fn inexpressible_trees() {
        let two_attrs = AttributeCon(vec![
            AttributeRequest::new("irma-demo.MijnOverheid.fullName.firstname"),
            AttributeRequest::new("irma-demo.MijnOverheid.fullName.familyname"),
        ]);
        let over18 = AttributeCon(vec![AttributeRequest::new(
            "irma-demo.MijnOverheid.ageLimits.over18",
        )]);
        let disclose = AttributeConDisCon(vec![AttributeDisCon(vec![two_attrs, over18.clone()])]);
        assert!(matches!(
            to_legacy(&disclose, &Labels::new()),
            Err(SessionError::InexpressibleLegacy(_))
        ));

        let not_null = AttributeConDisCon(vec![AttributeDisCon(vec![AttributeCon(vec![
            AttributeRequest::new("irma-demo.MijnOverheid.fullName.prefix").not_null(),
        ])])]);
        assert!(to_legacy(&not_null, &Labels::new()).is_err());

        let fine = AttributeConDisCon(vec![AttributeDisCon(vec![over18])]);
        let legacy = to_legacy(&fine, &Labels::new()).unwrap();
        assert_eq!(legacy[0].label, "");
        assert!(matches!(legacy[0].attributes, LegacyAttributes::Any(ref ids) if ids.len() == 1));
    }
}
