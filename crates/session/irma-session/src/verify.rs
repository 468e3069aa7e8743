//! Verification of disclosures and signed messages.
//!
//! The zero-knowledge arithmetic is delegated to a [`ProofVerifier`]; this
//! module resolves keys and credential types through the configuration,
//! checks revocation and expiry, and matches the disclosed attributes
//! against the request. Semantic outcomes are reported as a [`ProofStatus`];
//! an `Err` means the artifact could not be interpreted at all.

use crate::condiscon::AttributeConDisCon;
use crate::error::{Result, SessionError};
use crate::proof::{
    AttributeProofStatus, DisclosedAttribute, DisclosedAttributeIndices, Disclosure, ProofD,
    SignedMessage, FIRST_ATTRIBUTE_INDEX,
};
use crate::request::{DisclosureRequest, SignatureRequest};
use chrono::{DateTime, Utc};
use irma_revocation::Accumulator;
use irma_scheme::{decode_attribute, Configuration, CredentialType, MetadataAttribute, PublicKey};
use irma_types::{Int, ProofStatus, TranslatedString};
use tracing::{debug, warn};

/// Disclosed attributes grouped per requested disjunction, with a trailing
/// group of unrequested ones.
pub type VerifiedAttributes = Vec<Vec<DisclosedAttribute>>;

/// The proof system checking the zero-knowledge proofs.
pub trait ProofVerifier: Send + Sync {
    /// Whether `proofs`, made with `keys` (one per proof), are valid and
    /// bound to `context` and `nonce`.
    fn verify_proofs(&self, proofs: &[ProofD], keys: &[&PublicKey], context: &Int, nonce: &Int)
        -> bool;

    /// Whether `proof` shows its credential is not revoked in `accumulator`.
    fn verify_non_revocation(&self, proof: &ProofD, accumulator: &Accumulator, key: &PublicKey)
        -> bool;
}

impl Disclosure {
    /// Verify these proofs against `request`, evaluating expiry now.
    pub fn verify(
        &self,
        conf: &Configuration,
        system: &dyn ProofVerifier,
        request: &DisclosureRequest,
    ) -> Result<(VerifiedAttributes, ProofStatus)> {
        Pipeline {
            conf,
            system,
            proofs: &self.proofs,
            indices: &self.indices,
            context: request.base.context(),
            nonce: request.base.nonce(),
            at: Utc::now(),
        }
        .run(Some(&request.disclose))
    }
}

impl SignedMessage {
    /// Verify the signature, optionally against the request it answers.
    ///
    /// Without a request only the proofs, the timestamp and expiry are
    /// checked, and all disclosed attributes are returned as one group.
    pub fn verify(
        &self,
        conf: &Configuration,
        system: &dyn ProofVerifier,
        request: Option<&SignatureRequest>,
    ) -> Result<(VerifiedAttributes, ProofStatus)> {
        if self.signature.is_empty() {
            debug!("empty signature");
            return Ok((Vec::new(), ProofStatus::Invalid));
        }

        if let Some(request) = request {
            let base = &request.disclosure.base;
            if request.message != self.message
                || base.nonce() != self.nonce
                || base.context() != self.context
            {
                warn!("signed message does not match the request");
                return Ok((Vec::new(), ProofStatus::Invalid));
            }
        }

        let Some(timestamp) = &self.timestamp else {
            warn!("signed message has no timestamp");
            return Ok((Vec::new(), ProofStatus::Invalid));
        };
        if let Err(e) = timestamp.verify(conf, &self.message, &self.signature) {
            warn!(server = %timestamp.server_url, error = %e, "timestamp rejected");
            return Ok((Vec::new(), ProofStatus::Invalid));
        }

        Pipeline {
            conf,
            system,
            proofs: &self.signature,
            indices: &self.indices,
            context: self.context.clone(),
            nonce: self.signature_nonce(),
            at: timestamp.time().as_datetime(),
        }
        .run(request.map(|r| &r.disclosure.disclose))
    }
}

/// A disclosed attribute together with where it was found.
struct Found {
    cred: usize,
    attr: u32,
    attribute: DisclosedAttribute,
}

struct Pipeline<'a> {
    conf: &'a Configuration,
    system: &'a dyn ProofVerifier,
    proofs: &'a [ProofD],
    indices: &'a DisclosedAttributeIndices,
    context: Int,
    nonce: Int,
    at: DateTime<Utc>,
}

impl Pipeline<'_> {
    fn run(&self, disclose: Option<&AttributeConDisCon>) -> Result<(VerifiedAttributes, ProofStatus)> {
        if self.proofs.is_empty() {
            debug!("no proofs to verify");
            return Ok((Vec::new(), ProofStatus::Invalid));
        }

        let mut metadata = Vec::with_capacity(self.proofs.len());
        let mut types = Vec::with_capacity(self.proofs.len());
        let mut keys = Vec::with_capacity(self.proofs.len());
        for (i, proof) in self.proofs.iter().enumerate() {
            let Some(value) = proof.metadata() else {
                warn!(proof = i, "proof discloses no metadata attribute");
                return Ok((Vec::new(), ProofStatus::Invalid));
            };
            let meta = match MetadataAttribute::from_int(value) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(proof = i, error = %e, "undecodable metadata attribute");
                    return Ok((Vec::new(), ProofStatus::Invalid));
                }
            };
            let ct = meta.credential_type(self.conf).ok_or_else(|| {
                SessionError::UnresolvedCredentialType(format!(
                    "{:?}",
                    meta.credential_type_reference()
                ))
            })?;
            let key = self
                .conf
                .public_key(&ct.issuer_identifier(), u32::from(meta.key_counter()))?;
            metadata.push(meta);
            types.push(ct);
            keys.push(key);
        }

        if !self
            .system
            .verify_proofs(self.proofs, &keys, &self.context, &self.nonce)
        {
            warn!("zero-knowledge proofs do not verify");
            return Ok((Vec::new(), ProofStatus::Invalid));
        }

        for (i, proof) in self.proofs.iter().enumerate() {
            if types[i].revocation && !self.not_revoked(proof, types[i], keys[i]) {
                return Ok((Vec::new(), ProofStatus::Invalid));
            }
        }

        let mut status = ProofStatus::Valid;
        if metadata.iter().any(|m| !m.is_valid_at(self.at)) {
            debug!(at = %self.at, "credential expired");
            status = ProofStatus::Expired;
        }

        let mut found = Vec::new();
        for (i, proof) in self.proofs.iter().enumerate() {
            let ct = types[i];
            let issuance_time = metadata[i].signing_date().into();
            for (position, value) in proof.disclosed_attributes() {
                let Some(description) = ct.attributes.get(position) else {
                    warn!(proof = i, position, credential = %ct.identifier(), "attribute out of range");
                    return Ok((Vec::new(), ProofStatus::Invalid));
                };
                let raw_value = decode_attribute(value, metadata[i].version());
                let value = raw_value
                    .as_deref()
                    .map(TranslatedString::trivial)
                    .unwrap_or_default();
                found.push(Found {
                    cred: i,
                    attr: position as u32 + FIRST_ATTRIBUTE_INDEX,
                    attribute: DisclosedAttribute {
                        id: ct.attribute_identifier(description),
                        raw_value,
                        value,
                        status: AttributeProofStatus::Present,
                        issuance_time,
                    },
                });
            }
        }

        let Some(disclose) = disclose else {
            let all = found.into_iter().map(|f| f.attribute).collect();
            debug!(?status, "verified without request");
            return Ok((vec![all], status));
        };

        let (attributes, satisfied) = self.match_request(disclose, &found);
        if !satisfied {
            status = status.combine(ProofStatus::MissingAttributes);
        }
        debug!(?status, "verified disclosure");
        Ok((attributes, status))
    }

    fn not_revoked(&self, proof: &ProofD, ct: &CredentialType, key: &PublicKey) -> bool {
        let typ = ct.identifier();
        let Some(nonrev) = &proof.nonrev_proof else {
            warn!(credential = %typ, "missing non-revocation proof");
            return false;
        };
        let claimed = match self
            .conf
            .revocation_key(&typ, key.counter)
            .map_err(|e| e.to_string())
            .and_then(|vk| {
                nonrev
                    .signed_accumulator
                    .unmarshal_verify(&vk)
                    .map_err(|e| e.to_string())
            }) {
            Ok(acc) => acc,
            Err(error) => {
                warn!(credential = %typ, %error, "non-revocation accumulator rejected");
                return false;
            }
        };
        let stored = self
            .conf
            .revocation()
            .signed_accumulator(&typ, key.counter)
            .and_then(|sacc| sacc.accumulator().ok());
        let Some(stored) = stored else {
            warn!(credential = %typ, counter = key.counter, "no accumulator known");
            return false;
        };
        if claimed.index < stored.index {
            warn!(
                credential = %typ,
                claimed = claimed.index,
                current = stored.index,
                "non-revocation proof uses a stale accumulator"
            );
            return false;
        }
        if !self.system.verify_non_revocation(proof, &claimed, key) {
            warn!(credential = %typ, "non-revocation proof does not verify");
            return false;
        }
        true
    }

    /// Pick, per disjunction, the first satisfied conjunction. Returns the
    /// grouped attributes and whether every disjunction was satisfied.
    fn match_request(&self, disclose: &AttributeConDisCon, found: &[Found]) -> (VerifiedAttributes, bool) {
        let use_indices = self.indices.len() == disclose.len();
        let mut used = vec![false; found.len()];
        let mut satisfied = true;
        let mut groups = Vec::with_capacity(disclose.len() + 1);

        for (i, discon) in disclose.iter().enumerate() {
            let candidates: Vec<usize> = if use_indices {
                self.indices[i]
                    .iter()
                    .filter_map(|ix| found.iter().position(|f| f.cred == ix.cred && f.attr == ix.attr))
                    .collect()
            } else {
                (0..found.len()).collect()
            };

            let matched = discon.iter().find_map(|con| {
                con.satisfy(candidates.iter().map(|&k| {
                    let a = &found[k].attribute;
                    (&a.id, a.raw_value.as_deref())
                }))
            });

            match matched {
                Some(positions) => {
                    let group = positions
                        .into_iter()
                        .map(|p| {
                            let k = candidates[p];
                            used[k] = true;
                            found[k].attribute.clone()
                        })
                        .collect();
                    groups.push(group);
                }
                None => {
                    debug!(disjunction = i, "disjunction not satisfied");
                    satisfied = false;
                    let nulls = discon
                        .first()
                        .map(|con| {
                            con.iter()
                                .map(|r| DisclosedAttribute::null(r.attribute_type.clone()))
                                .collect()
                        })
                        .unwrap_or_default();
                    groups.push(nulls);
                }
            }
        }

        let extra: Vec<_> = found
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(f, _)| DisclosedAttribute {
                status: AttributeProofStatus::Extra,
                ..f.attribute.clone()
            })
            .collect();
        if !extra.is_empty() {
            groups.push(extra);
        }
        (groups, satisfied)
    }
}
