//! Attribute request trees.
//!
//! A request for attributes is a conjunction of disjunctions of conjunctions
//! (ConDisCon): every outer item must be satisfied, by any one of its inner
//! conjunctions, each of which asks for a set of attributes disclosed together.

use crate::error::{Result, SessionError};
use irma_scheme::Configuration;
use irma_types::{AttributeTypeIdentifier, CredentialTypeIdentifier};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

/// One requested attribute, optionally with the value it must have.
///
/// On the wire a request without constraints is just the identifier string;
/// otherwise it is `{"type": ..., "value": ..., "notNull": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "AttributeRequestWire")]
pub struct AttributeRequest {
    pub attribute_type: AttributeTypeIdentifier,
    pub value: Option<String>,
    /// The attribute must be present in the credential, even if optional.
    pub not_null: bool,
}

impl AttributeRequest {
    pub fn new(attribute_type: impl Into<AttributeTypeIdentifier>) -> Self {
        Self {
            attribute_type: attribute_type.into(),
            value: None,
            not_null: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn credential_type(&self) -> CredentialTypeIdentifier {
        self.attribute_type.credential_type()
    }

    fn is_bare(&self) -> bool {
        self.value.is_none() && !self.not_null
    }

    /// Whether a disclosed attribute of type `id` with raw value `value`
    /// (`None` when absent) meets this request.
    pub fn satisfied_by(&self, id: &AttributeTypeIdentifier, value: Option<&str>) -> bool {
        if *id != self.attribute_type {
            return false;
        }
        match (&self.value, value) {
            (Some(expected), Some(found)) => expected == found,
            (Some(_), None) => false,
            (None, found) => !self.not_null || found.is_some(),
        }
    }
}

impl From<&str> for AttributeRequest {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Serialize, Deserialize)]
struct AttributeRequestObject {
    #[serde(rename = "type")]
    attribute_type: AttributeTypeIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, rename = "notNull", skip_serializing_if = "std::ops::Not::not")]
    not_null: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeRequestWire {
    Bare(AttributeTypeIdentifier),
    Object(AttributeRequestObject),
}

impl From<AttributeRequestWire> for AttributeRequest {
    fn from(wire: AttributeRequestWire) -> Self {
        match wire {
            AttributeRequestWire::Bare(attribute_type) => Self::new(attribute_type),
            AttributeRequestWire::Object(o) => Self {
                attribute_type: o.attribute_type,
                value: o.value,
                not_null: o.not_null,
            },
        }
    }
}

impl Serialize for AttributeRequest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_bare() {
            return self.attribute_type.serialize(serializer);
        }
        AttributeRequestObject {
            attribute_type: self.attribute_type.clone(),
            value: self.value.clone(),
            not_null: self.not_null,
        }
        .serialize(serializer)
    }
}

macro_rules! list_newtype {
    ($(#[$doc:meta])* $name:ident, $item:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Vec<$item>);

        impl Deref for $name {
            type Target = Vec<$item>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl From<Vec<$item>> for $name {
            fn from(items: Vec<$item>) -> Self {
                Self(items)
            }
        }

        impl FromIterator<$item> for $name {
            fn from_iter<I: IntoIterator<Item = $item>>(iter: I) -> Self {
                Self(iter.into_iter().collect())
            }
        }
    };
}

list_newtype!(
    /// Attributes that must all be disclosed together.
    AttributeCon,
    AttributeRequest
);
list_newtype!(
    /// Alternatives, any one of which satisfies the disjunction.
    AttributeDisCon,
    AttributeCon
);
list_newtype!(
    /// Disjunctions that must all be satisfied.
    AttributeConDisCon,
    AttributeDisCon
);

impl AttributeCon {
    /// Distinct credential types this conjunction draws from.
    pub fn credential_types(&self) -> BTreeSet<CredentialTypeIdentifier> {
        self.iter().map(AttributeRequest::credential_type).collect()
    }

    /// Number of distinct non-singleton credential types requested. Unknown
    /// credential types are an error.
    pub fn non_singleton_count(&self, conf: &Configuration) -> Result<usize> {
        let mut count = 0;
        for id in self.credential_types() {
            let ct = conf
                .credential_type(&id)
                .ok_or(SessionError::UnknownCredentialType(id))?;
            if !ct.singleton {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Match this conjunction against disclosed `(type, raw value)` pairs.
    ///
    /// Returns, per request and in request order, the position of the
    /// candidate it was matched with; each candidate is used at most once.
    /// Earlier candidates are preferred, but a request gives up its candidate
    /// when that is the only way to satisfy a later one.
    pub fn satisfy<'a, I>(&self, candidates: I) -> Option<Vec<usize>>
    where
        I: IntoIterator<Item = (&'a AttributeTypeIdentifier, Option<&'a str>)>,
    {
        let candidates: Vec<_> = candidates.into_iter().collect();
        let fits: Vec<Vec<usize>> = self
            .iter()
            .map(|request| {
                candidates
                    .iter()
                    .enumerate()
                    .filter(|(_, (id, value))| request.satisfied_by(id, *value))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        let mut owner: Vec<Option<usize>> = vec![None; candidates.len()];
        for request in 0..fits.len() {
            let mut seen = vec![false; candidates.len()];
            if !assign(request, &fits, &mut owner, &mut seen) {
                return None;
            }
        }

        let mut matched = vec![0; fits.len()];
        for (candidate, request) in owner.iter().enumerate() {
            if let Some(request) = request {
                matched[*request] = candidate;
            }
        }
        Some(matched)
    }
}

/// Find a candidate for `request`, moving earlier assignments along an
/// augmenting path where needed.
fn assign(
    request: usize,
    fits: &[Vec<usize>],
    owner: &mut [Option<usize>],
    seen: &mut [bool],
) -> bool {
    for &candidate in &fits[request] {
        if seen[candidate] {
            continue;
        }
        seen[candidate] = true;
        let free = match owner[candidate] {
            None => true,
            Some(other) => assign(other, fits, owner, seen),
        };
        if free {
            owner[candidate] = Some(request);
            return true;
        }
    }
    false
}

impl AttributeConDisCon {
    /// Check the singleton rule: within each inner conjunction at most one
    /// requested credential type may be non-singleton.
    pub fn validate(&self, conf: &Configuration) -> Result<()> {
        for (i, discon) in self.iter().enumerate() {
            for con in discon.iter() {
                if con.non_singleton_count(conf)? > 1 {
                    return Err(SessionError::MultipleNonSingletons(i));
                }
            }
        }
        Ok(())
    }

    /// Every attribute type mentioned anywhere in the tree.
    pub fn attribute_types(&self) -> impl Iterator<Item = &AttributeTypeIdentifier> {
        self.iter()
            .flat_map(|discon| discon.iter())
            .flat_map(|con| con.iter())
            .map(|request| &request.attribute_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_and_object_forms() {
        let json = r#"["irma-demo.MijnOverheid.ageLimits.over18",
                      {"type": "irma-demo.MijnOverheid.fullName.firstname", "value": "hello"},
                      {"type": "irma-demo.MijnOverheid.fullName.prefix", "notNull": true}]"#;
        let con: AttributeCon = serde_json::from_str(json).unwrap();
        assert_eq!(con[0], AttributeRequest::new("irma-demo.MijnOverheid.ageLimits.over18"));
        assert_eq!(con[1].value.as_deref(), Some("hello"));
        assert!(con[2].not_null);

        let out = serde_json::to_value(&con).unwrap();
        assert_eq!(out[0], "irma-demo.MijnOverheid.ageLimits.over18");
        assert_eq!(out[1]["value"], "hello");
        assert!(out[1].get("notNull").is_none());
        assert_eq!(out[2]["notNull"], true);
    }

    #[test]
    fn request_matching() {
        let id = AttributeTypeIdentifier::from("irma-demo.MijnOverheid.fullName.firstname");
        let plain = AttributeRequest::new(id.clone());
        assert!(plain.satisfied_by(&id, Some("x")));
        assert!(plain.satisfied_by(&id, None));
        assert!(!plain.not_null().satisfied_by(&id, None));

        let valued = AttributeRequest::new(id.clone()).with_value("hello");
        assert!(valued.satisfied_by(&id, Some("hello")));
        assert!(!valued.satisfied_by(&id, Some("Hello")));
        let other = AttributeTypeIdentifier::from("irma-demo.MijnOverheid.fullName.familyname");
        assert!(!valued.satisfied_by(&other, Some("hello")));
    }

    #[test]
    fn candidates_are_used_once() {
        let id = AttributeTypeIdentifier::from("irma-demo.RU.studentCard.studentID");
        let con = AttributeCon(vec![
            AttributeRequest::new(id.clone()),
            AttributeRequest::new(id.clone()),
        ]);
        assert_eq!(con.satisfy([(&id, Some("1"))]), None);
        assert_eq!(con.satisfy([(&id, Some("1")), (&id, Some("2"))]), Some(vec![0, 1]));
        assert_eq!(AttributeCon::default().satisfy(std::iter::empty()), Some(vec![]));
    }

    #[test]
    fn valued_request_takes_precedence_over_free_one() {
        let id = AttributeTypeIdentifier::from("irma-demo.RU.studentCard.level");
        let con = AttributeCon(vec![
            AttributeRequest::new(id.clone()),
            AttributeRequest::new(id.clone()).with_value("x"),
        ]);
        assert_eq!(con.satisfy([(&id, Some("x")), (&id, Some("y"))]), Some(vec![1, 0]));
        assert_eq!(con.satisfy([(&id, Some("y")), (&id, Some("z"))]), None);
    }
}
