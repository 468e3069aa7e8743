//! Verification and parsing of a single scheme manager directory.
//!
//! A manager is parsed into a [`ParsedScheme`] in isolation and only merged
//! into the configuration once every check passed, so a failing manager never
//! leaves half of its issuers behind.

use crate::descriptions::{CredentialType, Issuer, PublicKey, SchemeManager};
use crate::error::{SchemeManagerError, SchemeManagerStatus};
use crate::fs;
use crate::index::{
    verify_index_signature, SchemeManagerIndex, INDEX_FILE, INDEX_SIGNATURE_FILE,
    PUBLIC_KEY_FILE, UNINDEXED_FILES,
};
use irma_crypto::{decode_verifying_key, VerifyingKey};
use irma_types::{IssuerIdentifier, SchemeManagerIdentifier};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

pub(crate) const DESCRIPTION_FILE: &str = "description.json";
pub(crate) const TIMESTAMP_FILE: &str = "timestamp";

/// Everything one valid scheme manager contributes to the configuration.
#[derive(Debug, Clone)]
pub(crate) struct ParsedScheme {
    pub manager: SchemeManager,
    pub issuers: Vec<Issuer>,
    pub credential_types: Vec<CredentialType>,
    pub public_keys: Vec<(IssuerIdentifier, PublicKey)>,
}

/// A manager that failed to load, with as much of its description as could
/// be read.
#[derive(Debug, Clone)]
pub(crate) struct FailedScheme {
    pub manager: SchemeManager,
    pub error: SchemeManagerError,
}

/// Verify and parse the manager stored in `dir`.
pub(crate) fn load_scheme_manager(
    id: &SchemeManagerIdentifier,
    dir: &Path,
) -> Result<ParsedScheme, FailedScheme> {
    let fail = |manager: SchemeManager, error: SchemeManagerError| {
        let mut manager = manager;
        manager.status = error.status;
        manager.valid = false;
        FailedScheme { manager, error }
    };

    // Read the description up front so that a manager failing verification
    // is still displayed under its own name.
    let described = match read_description(id, dir) {
        Ok(manager) => manager,
        Err(error) => return Err(fail(SchemeManager::placeholder(id), error)),
    };

    let files = match verify_scheme_manager(id, dir) {
        Ok(files) => files,
        Err(error) => return Err(fail(described, error)),
    };

    match parse_verified(id, &files) {
        Ok(parsed) => Ok(parsed),
        Err(error) => Err(fail(described, error)),
    }
}

pub(crate) fn read_description(
    id: &SchemeManagerIdentifier,
    dir: &Path,
) -> Result<SchemeManager, SchemeManagerError> {
    let bytes = fs::read(&dir.join(DESCRIPTION_FILE))
        .map_err(|e| SchemeManagerError::new(id, SchemeManagerStatus::ParsingError, e))?;
    let manager: SchemeManager = serde_json::from_slice(&bytes)
        .map_err(|e| SchemeManagerError::new(id, SchemeManagerStatus::ParsingError, e))?;
    if manager.id != id.as_str() {
        return Err(SchemeManagerError::new(
            id,
            SchemeManagerStatus::ParsingError,
            format!("description declares id {:?}", manager.id),
        ));
    }
    Ok(manager)
}

/// The manager's trust anchor as stored in `dir`.
pub(crate) fn read_trust_anchor(
    id: &SchemeManagerIdentifier,
    dir: &Path,
) -> Result<VerifyingKey, SchemeManagerError> {
    let invalid = |e: &dyn std::fmt::Display| {
        SchemeManagerError::new(id, SchemeManagerStatus::InvalidIndex, format!("public key: {e}"))
    };
    let pk = fs::read(&dir.join(PUBLIC_KEY_FILE)).map_err(|e| invalid(&e))?;
    let pk = String::from_utf8_lossy(&pk);
    decode_verifying_key(&pk).map_err(|e| invalid(&e))
}

/// Check the index signature against the manager's public key, and that
/// every file in `dir` is listed in the index with a matching hash.
///
/// Returns the verified file contents keyed by path relative to `dir`.
pub(crate) fn verify_scheme_manager(
    id: &SchemeManagerIdentifier,
    dir: &Path,
) -> Result<BTreeMap<String, Vec<u8>>, SchemeManagerError> {
    let invalid_index =
        |e: &dyn std::fmt::Display| SchemeManagerError::new(id, SchemeManagerStatus::InvalidIndex, e);
    let invalid_signature = |e: &dyn std::fmt::Display| {
        SchemeManagerError::new(id, SchemeManagerStatus::InvalidSignature, e)
    };

    let pk = read_trust_anchor(id, dir)?;
    let index_bytes = fs::read(&dir.join(INDEX_FILE)).map_err(|e| invalid_index(&e))?;
    let signature = fs::read(&dir.join(INDEX_SIGNATURE_FILE)).map_err(|e| invalid_index(&e))?;
    verify_index_signature(&index_bytes, &String::from_utf8_lossy(&signature), &pk)
        .map_err(|e| invalid_signature(&e))?;

    let index_text = String::from_utf8(index_bytes).map_err(|e| invalid_index(&e))?;
    let index = SchemeManagerIndex::parse(&index_text, id.as_str()).map_err(|e| invalid_index(&e))?;

    let mut files = BTreeMap::new();
    let listing = fs::files_below(dir).map_err(|e| invalid_index(&e))?;
    for rel in listing {
        if UNINDEXED_FILES.contains(&rel.as_str()) {
            continue;
        }
        let contents = fs::read(&dir.join(&rel)).map_err(|e| invalid_index(&e))?;
        let indexed = format!("{id}/{rel}");
        if !index.matches(&indexed, &contents) {
            let reason = match index.get(&indexed) {
                Some(_) => format!("hash of {indexed} does not match index"),
                None => format!("{indexed} is not in the index"),
            };
            return Err(invalid_signature(&reason));
        }
        files.insert(rel, contents);
    }
    debug!(manager = %id, files = files.len(), "verified scheme manager index");
    Ok(files)
}

fn parse_json<T: DeserializeOwned>(
    id: &SchemeManagerIdentifier,
    status: SchemeManagerStatus,
    path: &str,
    bytes: &[u8],
) -> Result<T, SchemeManagerError> {
    serde_json::from_slice(bytes).map_err(|e| SchemeManagerError::new(id, status, format!("{path}: {e}")))
}

/// Build the manager from files that passed [`verify_scheme_manager`].
pub(crate) fn parse_verified(
    id: &SchemeManagerIdentifier,
    files: &BTreeMap<String, Vec<u8>>,
) -> Result<ParsedScheme, SchemeManagerError> {
    use SchemeManagerStatus::{ContentParsingError, ParsingError};
    let content_error = |reason: String| SchemeManagerError::new(id, ContentParsingError, reason);

    let description = files
        .get(DESCRIPTION_FILE)
        .ok_or_else(|| SchemeManagerError::new(id, ParsingError, "missing description.json"))?;
    let mut manager: SchemeManager = parse_json(id, ParsingError, DESCRIPTION_FILE, description)?;
    if manager.id != id.as_str() {
        return Err(SchemeManagerError::new(
            id,
            ParsingError,
            format!("description declares id {:?}", manager.id),
        ));
    }
    let timestamp = files
        .get(TIMESTAMP_FILE)
        .and_then(|t| String::from_utf8_lossy(t).trim().parse::<i64>().ok())
        .ok_or_else(|| SchemeManagerError::new(id, ParsingError, "missing or malformed timestamp"))?;

    let mut issuers = BTreeMap::new();
    let mut credential_types = Vec::new();
    let mut public_keys = Vec::new();

    for (path, bytes) in files {
        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            [issuer, DESCRIPTION_FILE] => {
                let desc: Issuer = parse_json(id, ContentParsingError, path, bytes)?;
                if desc.id != *issuer || desc.scheme_manager != id.as_str() {
                    return Err(content_error(format!(
                        "{path} declares issuer {}.{}",
                        desc.scheme_manager, desc.id
                    )));
                }
                issuers.insert(issuer.to_string(), desc);
            }
            [issuer, "PublicKeys", file] => {
                let Some(counter) = file.strip_suffix(".json") else {
                    continue;
                };
                let key: PublicKey = parse_json(id, ContentParsingError, path, bytes)?;
                if counter.parse::<u32>().ok() != Some(key.counter) {
                    return Err(content_error(format!(
                        "{path} declares counter {}",
                        key.counter
                    )));
                }
                if let Some(Err(e)) = key.revocation_verifying_key() {
                    return Err(content_error(format!("{path}: revocation key: {e}")));
                }
                public_keys.push((IssuerIdentifier::new(format!("{id}.{issuer}")), key));
            }
            [issuer, "Issues", credential, DESCRIPTION_FILE] => {
                let ct: CredentialType = parse_json(id, ContentParsingError, path, bytes)?;
                if ct.id != *credential || ct.issuer != *issuer || ct.scheme_manager != id.as_str() {
                    return Err(content_error(format!(
                        "{path} declares credential type {}",
                        ct.identifier()
                    )));
                }
                let mut seen = HashSet::new();
                if let Some(dup) = ct.attributes.iter().find(|a| !seen.insert(a.id.as_str())) {
                    return Err(content_error(format!(
                        "{path} declares attribute {} twice",
                        dup.id
                    )));
                }
                credential_types.push(ct);
            }
            // logos and other assets
            _ => {}
        }
    }

    for ct in &credential_types {
        if !issuers.contains_key(&ct.issuer) {
            return Err(content_error(format!(
                "credential type {} has no issuer description",
                ct.identifier()
            )));
        }
    }
    for (issuer, _) in &public_keys {
        if !issuers.contains_key(issuer.name()) {
            return Err(content_error(format!(
                "public key of unknown issuer {issuer}"
            )));
        }
    }

    manager.status = SchemeManagerStatus::Valid;
    manager.valid = true;
    manager.timestamp = Some(timestamp);
    Ok(ParsedScheme {
        manager,
        issuers: issuers.into_values().collect(),
        credential_types,
        public_keys,
    })
}

/// The `timestamp` of the manager stored in `dir`, if readable.
pub(crate) fn read_timestamp(dir: &Path) -> Option<i64> {
    let bytes = fs::read(&dir.join(TIMESTAMP_FILE)).ok()?;
    String::from_utf8_lossy(&bytes).trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn testdata(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../../testdata").join(name)
    }

    #[test]
    fn loads_valid_manager() {
        let id = SchemeManagerIdentifier::new("irma-demo");
        let parsed = load_scheme_manager(&id, &testdata("irma_configuration/irma-demo")).unwrap();
        assert_eq!(parsed.manager.status, SchemeManagerStatus::Valid);
        assert_eq!(parsed.manager.timestamp, Some(1500000000));
        assert_eq!(parsed.issuers.len(), 2);
        assert_eq!(parsed.credential_types.len(), 4);
        assert_eq!(parsed.public_keys.len(), 4);
    }

    #[test]
    fn edited_description_breaks_signature() {
        let id = SchemeManagerIdentifier::new("irma-demo");
        let failed =
            load_scheme_manager(&id, &testdata("irma_configuration_invalid/irma-demo")).unwrap_err();
        assert_eq!(failed.error.status, SchemeManagerStatus::InvalidSignature);
        assert_eq!(failed.manager.status, SchemeManagerStatus::InvalidSignature);
        assert!(!failed.manager.valid);
        assert_eq!(failed.manager.name.get("en"), Some("Irma Demo (edited)"));
    }

    #[test]
    fn missing_manager_gets_placeholder() {
        let id = SchemeManagerIdentifier::new("nope");
        let tmp = tempfile::tempdir().unwrap();
        let failed = load_scheme_manager(&id, tmp.path()).unwrap_err();
        assert_eq!(failed.error.status, SchemeManagerStatus::ParsingError);
        assert_eq!(failed.manager.id, "nope");
    }
}
