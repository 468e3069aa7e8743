//! Session requests.
//!
//! Three kinds of session share a [`BaseRequest`]: disclosure, signature
//! (disclosure plus a message) and issuance (credentials plus an optional
//! disclosure). Each accepts both wire schemas on input, detected by the
//! presence of `@context`, and always writes the current schema. The legacy
//! schema is available through the `legacy()` conversions.

use crate::condiscon::AttributeConDisCon;
use crate::error::{Result, SessionError};
use crate::legacy::{
    self, Labels, LegacyDisclosureRequest, LegacyIssuanceRequest, LegacySessionRequest,
    LegacySignatureRequest, LEGACY_DISCLOSING, LEGACY_ISSUING, LEGACY_SIGNING,
};
use irma_scheme::Configuration;
use irma_types::{CredentialTypeIdentifier, Int, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub const LD_CONTEXT_DISCLOSURE_REQUEST: &str = "https://irma.app/ld/request/disclosure/v2";
pub const LD_CONTEXT_SIGNATURE_REQUEST: &str = "https://irma.app/ld/request/signature/v2";
pub const LD_CONTEXT_ISSUANCE_REQUEST: &str = "https://irma.app/ld/request/issuance/v2";

/// Fields common to every session request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseRequest {
    #[serde(rename = "@context")]
    pub ld_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Int>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Int>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
}

impl BaseRequest {
    fn with_context(ld_context: &str) -> Self {
        Self {
            ld_context: ld_context.to_string(),
            ..Default::default()
        }
    }

    /// The proof context, one when unset.
    pub fn context(&self) -> Int {
        self.context.clone().unwrap_or_else(|| Int::from_u64(1))
    }

    /// The proof nonce, zero when unset.
    pub fn nonce(&self) -> Int {
        self.nonce.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct DisclosureRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub disclose: AttributeConDisCon,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct SignatureRequest {
    #[serde(flatten)]
    pub disclosure: DisclosureRequest,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct IssuanceRequest {
    #[serde(flatten)]
    pub disclosure: DisclosureRequest,
    pub credentials: Vec<CredentialRequest>,
}

/// One credential to be issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub credential: CredentialTypeIdentifier,
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_counter: Option<u32>,
}

/// Any session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum SessionRequest {
    Disclosure(DisclosureRequest),
    Signature(SignatureRequest),
    Issuance(IssuanceRequest),
}

/// Which wire schema a request JSON object uses.
enum Schema {
    Current(String),
    Legacy(String),
}

impl Schema {
    fn detect(value: &Value) -> Result<Self> {
        if let Some(context) = value.get("@context").and_then(Value::as_str) {
            return Ok(Schema::Current(context.to_string()));
        }
        if let Some(kind) = value.get("type").and_then(Value::as_str) {
            return Ok(Schema::Legacy(kind.to_string()));
        }
        Err(SessionError::UnrecognizedRequest(
            "neither @context nor type present".to_string(),
        ))
    }

    fn is_legacy_of(self, current: &str, legacy: &str) -> Result<bool> {
        match self {
            Schema::Current(c) if c == current => Ok(false),
            Schema::Legacy(l) if l == legacy => Ok(true),
            Schema::Current(other) | Schema::Legacy(other) => Err(
                SessionError::UnrecognizedRequest(format!("expected {current}, got {other}")),
            ),
        }
    }
}

mod labels_format {
    use super::Labels;
    use irma_types::TranslatedString;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use std::collections::BTreeMap;

    /// Positions arrive as string keys, also when buffered for flattening.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Labels, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Option<TranslatedString>>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(k, v)| {
                k.parse::<usize>()
                    .map(|k| (k, v))
                    .map_err(|_| D::Error::custom(format!("invalid label position {k:?}")))
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct CurrentDisclosure {
    #[serde(flatten)]
    base: BaseRequest,
    #[serde(default)]
    disclose: AttributeConDisCon,
    #[serde(default, deserialize_with = "labels_format::deserialize")]
    labels: Labels,
}

#[derive(Deserialize)]
struct CurrentSignature {
    #[serde(flatten)]
    base: BaseRequest,
    #[serde(default)]
    disclose: AttributeConDisCon,
    #[serde(default, deserialize_with = "labels_format::deserialize")]
    labels: Labels,
    message: String,
}

#[derive(Deserialize)]
struct CurrentIssuance {
    #[serde(flatten)]
    base: BaseRequest,
    #[serde(default)]
    disclose: AttributeConDisCon,
    #[serde(default, deserialize_with = "labels_format::deserialize")]
    labels: Labels,
    credentials: Vec<CredentialRequest>,
}

impl TryFrom<Value> for DisclosureRequest {
    type Error = SessionError;

    fn try_from(value: Value) -> Result<Self> {
        let legacy =
            Schema::detect(&value)?.is_legacy_of(LD_CONTEXT_DISCLOSURE_REQUEST, LEGACY_DISCLOSING)?;
        if legacy {
            debug!("parsing legacy disclosure request");
            return Ok(serde_json::from_value::<LegacyDisclosureRequest>(value)?.into());
        }
        let wire: CurrentDisclosure = serde_json::from_value(value)?;
        Ok(Self {
            base: wire.base,
            disclose: wire.disclose,
            labels: wire.labels,
        })
    }
}

impl TryFrom<Value> for SignatureRequest {
    type Error = SessionError;

    fn try_from(value: Value) -> Result<Self> {
        let legacy =
            Schema::detect(&value)?.is_legacy_of(LD_CONTEXT_SIGNATURE_REQUEST, LEGACY_SIGNING)?;
        if legacy {
            debug!("parsing legacy signature request");
            return Ok(serde_json::from_value::<LegacySignatureRequest>(value)?.into());
        }
        let wire: CurrentSignature = serde_json::from_value(value)?;
        Ok(Self {
            disclosure: DisclosureRequest {
                base: wire.base,
                disclose: wire.disclose,
                labels: wire.labels,
            },
            message: wire.message,
        })
    }
}

impl TryFrom<Value> for IssuanceRequest {
    type Error = SessionError;

    fn try_from(value: Value) -> Result<Self> {
        let legacy =
            Schema::detect(&value)?.is_legacy_of(LD_CONTEXT_ISSUANCE_REQUEST, LEGACY_ISSUING)?;
        if legacy {
            debug!("parsing legacy issuance request");
            return Ok(serde_json::from_value::<LegacyIssuanceRequest>(value)?.into());
        }
        let wire: CurrentIssuance = serde_json::from_value(value)?;
        Ok(Self {
            disclosure: DisclosureRequest {
                base: wire.base,
                disclose: wire.disclose,
                labels: wire.labels,
            },
            credentials: wire.credentials,
        })
    }
}

impl TryFrom<Value> for SessionRequest {
    type Error = SessionError;

    fn try_from(value: Value) -> Result<Self> {
        let kind = match Schema::detect(&value)? {
            Schema::Current(c) => c,
            Schema::Legacy(l) => l,
        };
        match kind.as_str() {
            LD_CONTEXT_DISCLOSURE_REQUEST | LEGACY_DISCLOSING => {
                DisclosureRequest::try_from(value).map(SessionRequest::Disclosure)
            }
            LD_CONTEXT_SIGNATURE_REQUEST | LEGACY_SIGNING => {
                SignatureRequest::try_from(value).map(SessionRequest::Signature)
            }
            LD_CONTEXT_ISSUANCE_REQUEST | LEGACY_ISSUING => {
                IssuanceRequest::try_from(value).map(SessionRequest::Issuance)
            }
            other => Err(SessionError::UnrecognizedRequest(format!(
                "unknown request kind {other}"
            ))),
        }
    }
}

impl From<LegacyDisclosureRequest> for DisclosureRequest {
    fn from(legacy: LegacyDisclosureRequest) -> Self {
        let (disclose, labels) = legacy::from_legacy(legacy.content);
        Self {
            base: BaseRequest {
                context: legacy.context,
                nonce: legacy.nonce,
                ..BaseRequest::with_context(LD_CONTEXT_DISCLOSURE_REQUEST)
            },
            disclose,
            labels,
        }
    }
}

impl From<LegacySignatureRequest> for SignatureRequest {
    fn from(legacy: LegacySignatureRequest) -> Self {
        let (disclose, labels) = legacy::from_legacy(legacy.content);
        Self {
            disclosure: DisclosureRequest {
                base: BaseRequest {
                    context: legacy.context,
                    nonce: legacy.nonce,
                    ..BaseRequest::with_context(LD_CONTEXT_SIGNATURE_REQUEST)
                },
                disclose,
                labels,
            },
            message: legacy.message,
        }
    }
}

impl From<LegacyIssuanceRequest> for IssuanceRequest {
    fn from(legacy: LegacyIssuanceRequest) -> Self {
        let (disclose, labels) = legacy::from_legacy(legacy.disclose);
        Self {
            disclosure: DisclosureRequest {
                base: BaseRequest {
                    context: legacy.context,
                    nonce: legacy.nonce,
                    ..BaseRequest::with_context(LD_CONTEXT_ISSUANCE_REQUEST)
                },
                disclose,
                labels,
            },
            credentials: legacy.credentials,
        }
    }
}

impl DisclosureRequest {
    pub fn new(disclose: AttributeConDisCon) -> Self {
        Self {
            base: BaseRequest::with_context(LD_CONTEXT_DISCLOSURE_REQUEST),
            disclose,
            labels: Labels::new(),
        }
    }

    pub fn legacy(&self) -> Result<LegacyDisclosureRequest> {
        Ok(LegacyDisclosureRequest {
            kind: LEGACY_DISCLOSING.to_string(),
            context: self.base.context.clone(),
            nonce: self.base.nonce.clone(),
            content: legacy::to_legacy(&self.disclose, &self.labels)?,
        })
    }

    /// Every requested attribute must exist, and the singleton rule must hold.
    pub fn validate(&self, conf: &Configuration) -> Result<()> {
        if self.disclose.is_empty() {
            return Err(SessionError::EmptyDisclosure);
        }
        self.validate_attributes(conf)
    }

    fn validate_attributes(&self, conf: &Configuration) -> Result<()> {
        for id in self.disclose.attribute_types() {
            if conf.attribute_type(id).is_none() {
                let ct = id.credential_type();
                if conf.credential_type(&ct).is_none() {
                    return Err(SessionError::UnknownCredentialType(ct));
                }
                return Err(SessionError::UnknownAttributeType(id.clone()));
            }
        }
        self.disclose.validate(conf)
    }
}

impl SignatureRequest {
    pub fn new(message: impl Into<String>, disclose: AttributeConDisCon) -> Self {
        Self {
            disclosure: DisclosureRequest {
                base: BaseRequest::with_context(LD_CONTEXT_SIGNATURE_REQUEST),
                disclose,
                labels: Labels::new(),
            },
            message: message.into(),
        }
    }

    pub fn legacy(&self) -> Result<LegacySignatureRequest> {
        let base = &self.disclosure.base;
        Ok(LegacySignatureRequest {
            kind: LEGACY_SIGNING.to_string(),
            context: base.context.clone(),
            nonce: base.nonce.clone(),
            message: self.message.clone(),
            content: legacy::to_legacy(&self.disclosure.disclose, &self.disclosure.labels)?,
        })
    }

    pub fn validate(&self, conf: &Configuration) -> Result<()> {
        if self.message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.disclosure.validate(conf)
    }
}

impl IssuanceRequest {
    pub fn new(credentials: Vec<CredentialRequest>) -> Self {
        Self {
            disclosure: DisclosureRequest {
                base: BaseRequest::with_context(LD_CONTEXT_ISSUANCE_REQUEST),
                disclose: AttributeConDisCon::default(),
                labels: Labels::new(),
            },
            credentials,
        }
    }

    pub fn legacy(&self) -> Result<LegacyIssuanceRequest> {
        let base = &self.disclosure.base;
        Ok(LegacyIssuanceRequest {
            kind: LEGACY_ISSUING.to_string(),
            context: base.context.clone(),
            nonce: base.nonce.clone(),
            credentials: self.credentials.clone(),
            disclose: legacy::to_legacy(&self.disclosure.disclose, &self.disclosure.labels)?,
        })
    }

    /// Every credential must be complete; an attached disclosure, if any,
    /// must be valid.
    pub fn validate(&self, conf: &Configuration) -> Result<()> {
        if self.credentials.is_empty() {
            return Err(SessionError::NoCredentials);
        }
        for credential in &self.credentials {
            credential.validate(conf)?;
        }
        if !self.disclosure.disclose.is_empty() {
            self.disclosure.validate_attributes(conf)?;
        }
        Ok(())
    }
}

impl CredentialRequest {
    pub fn new(credential: impl Into<CredentialTypeIdentifier>) -> Self {
        Self {
            credential: credential.into(),
            attributes: BTreeMap::new(),
            validity: None,
            key_counter: None,
        }
    }

    pub fn with_attribute(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(id.into(), value.into());
        self
    }

    /// The credential type must exist, every non-optional attribute must be
    /// given and no attribute may be unknown to the type.
    pub fn validate(&self, conf: &Configuration) -> Result<()> {
        let ct = conf
            .credential_type(&self.credential)
            .ok_or_else(|| SessionError::UnknownCredentialType(self.credential.clone()))?;
        if let Some(missing) = ct
            .attributes
            .iter()
            .find(|a| !a.optional && !self.attributes.contains_key(&a.id))
        {
            return Err(SessionError::MissingAttribute {
                credential: self.credential.clone(),
                attribute: missing.id.clone(),
            });
        }
        if let Some(unknown) = self
            .attributes
            .keys()
            .find(|k| !ct.attributes.iter().any(|a| a.id == **k))
        {
            return Err(SessionError::UnknownAttribute {
                credential: self.credential.clone(),
                attribute: unknown.clone(),
            });
        }
        Ok(())
    }
}

impl SessionRequest {
    pub fn base(&self) -> &BaseRequest {
        &self.disclosure().base
    }

    pub fn base_mut(&mut self) -> &mut BaseRequest {
        &mut self.disclosure_mut().base
    }

    /// The disclosure part; empty for issuance without disclosure.
    pub fn disclosure(&self) -> &DisclosureRequest {
        match self {
            SessionRequest::Disclosure(r) => r,
            SessionRequest::Signature(r) => &r.disclosure,
            SessionRequest::Issuance(r) => &r.disclosure,
        }
    }

    pub fn disclosure_mut(&mut self) -> &mut DisclosureRequest {
        match self {
            SessionRequest::Disclosure(r) => r,
            SessionRequest::Signature(r) => &mut r.disclosure,
            SessionRequest::Issuance(r) => &mut r.disclosure,
        }
    }

    pub fn legacy(&self) -> Result<LegacySessionRequest> {
        Ok(match self {
            SessionRequest::Disclosure(r) => LegacySessionRequest::Disclosure(r.legacy()?),
            SessionRequest::Signature(r) => LegacySessionRequest::Signature(r.legacy()?),
            SessionRequest::Issuance(r) => LegacySessionRequest::Issuance(r.legacy()?),
        })
    }

    pub fn validate(&self, conf: &Configuration) -> Result<()> {
        match self {
            SessionRequest::Disclosure(r) => r.validate(conf),
            SessionRequest::Signature(r) => r.validate(conf),
            SessionRequest::Issuance(r) => r.validate(conf),
        }
    }
}
