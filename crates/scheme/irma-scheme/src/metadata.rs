//! The metadata attribute embedded in every credential.
//!
//! It is one big integer whose big-endian bytes pack the metadata version,
//! the signing date, the validity duration, the issuer key counter and a
//! reference to the credential type. Two layouts exist and credentials of
//! both are still in circulation:
//!
//! | version      | signing date | validity | key counter | credential type |
//! |--------------|--------------|----------|-------------|-----------------|
//! | `0x02`, `0x03` | 3 bytes    | 2 bytes  | 2 bytes     | 16-byte hash    |
//! | `0x04`       | 3 bytes      | 3 bytes  | 2 bytes     | 4-byte index    |
//!
//! Dates and durations are counted in weeks ([`EXPIRY_FACTOR`] seconds).

use crate::descriptions::CredentialType;
use crate::Configuration;
use chrono::{DateTime, TimeZone, Utc};
use irma_crypto::sha256;
use irma_types::{CredentialTypeIdentifier, Int};
use thiserror::Error;

/// Seconds per unit of signing date and validity.
pub const EXPIRY_FACTOR: i64 = 60 * 60 * 24 * 7;

/// Validity of freshly created metadata, in weeks.
pub const DEFAULT_VALIDITY_WEEKS: u32 = 26;

/// Version written by [`MetadataAttribute::new`] callers that don't care.
pub const CURRENT_METADATA_VERSION: u8 = 0x03;

const HASHED_LEN: usize = 1 + 3 + 2 + 2 + 16;
const INDEXED_LEN: usize = 1 + 3 + 3 + 2 + 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("unsupported metadata version {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("metadata of version {version:#04x} must be {expected} bytes, got {found}")]
    Length {
        version: u8,
        expected: usize,
        found: usize,
    },

    #[error("{0} does not fit in its metadata field")]
    Overflow(&'static str),

    #[error("credential type {0} has no index")]
    MissingIndex(CredentialTypeIdentifier),
}

/// The two metadata layouts, keyed by version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataLayout {
    Hashed,
    Indexed,
}

impl MetadataLayout {
    pub fn for_version(version: u8) -> Result<Self, MetadataError> {
        match version {
            0x02 | 0x03 => Ok(MetadataLayout::Hashed),
            0x04 => Ok(MetadataLayout::Indexed),
            v => Err(MetadataError::UnsupportedVersion(v)),
        }
    }

    fn len(self) -> usize {
        match self {
            MetadataLayout::Hashed => HASHED_LEN,
            MetadataLayout::Indexed => INDEXED_LEN,
        }
    }
}

/// How the metadata points at its credential type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialTypeReference {
    /// First 16 bytes of SHA-256 of the credential type identifier.
    Hash([u8; 16]),
    /// Explicit index from the credential type description.
    Index(u32),
}

/// First 16 bytes of SHA-256 over the identifier.
pub fn credential_type_hash(id: &CredentialTypeIdentifier) -> [u8; 16] {
    let digest = sha256([id.as_str().as_bytes()]);
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest.as_bytes()[..16]);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataAttribute {
    version: u8,
    signing_date: u32,
    validity: u32,
    key_counter: u16,
    credential_type: CredentialTypeReference,
}

impl MetadataAttribute {
    /// Fresh metadata signed now, valid for [`DEFAULT_VALIDITY_WEEKS`], with
    /// key counter zero and no credential type yet.
    pub fn new(version: u8) -> Result<Self, MetadataError> {
        let layout = MetadataLayout::for_version(version)?;
        let credential_type = match layout {
            MetadataLayout::Hashed => CredentialTypeReference::Hash([0u8; 16]),
            MetadataLayout::Indexed => CredentialTypeReference::Index(0),
        };
        let weeks = Utc::now().timestamp().div_euclid(EXPIRY_FACTOR);
        Ok(Self {
            version,
            signing_date: u32::try_from(weeks).map_err(|_| MetadataError::Overflow("signing date"))?,
            validity: DEFAULT_VALIDITY_WEEKS,
            key_counter: 0,
            credential_type,
        })
    }

    /// Decode a metadata attribute value.
    pub fn from_int(value: &Int) -> Result<Self, MetadataError> {
        let bytes = value.to_bytes_be();
        let version = bytes.first().copied().unwrap_or(0);
        let layout = MetadataLayout::for_version(version)?;
        if bytes.len() != layout.len() {
            return Err(MetadataError::Length {
                version,
                expected: layout.len(),
                found: bytes.len(),
            });
        }
        Ok(match layout {
            MetadataLayout::Hashed => decode_hashed(bytes),
            MetadataLayout::Indexed => decode_indexed(bytes),
        })
    }

    /// Encode back into the attribute value.
    pub fn to_int(&self) -> Result<Int, MetadataError> {
        let bytes = match self.layout() {
            MetadataLayout::Hashed => encode_hashed(self)?,
            MetadataLayout::Indexed => encode_indexed(self)?,
        };
        Ok(Int::from_bytes_be(&bytes))
    }

    pub fn layout(&self) -> MetadataLayout {
        // the version was checked on construction
        MetadataLayout::for_version(self.version).unwrap_or(MetadataLayout::Hashed)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn signing_date(&self) -> DateTime<Utc> {
        unix(i64::from(self.signing_date) * EXPIRY_FACTOR)
    }

    /// Validity duration in weeks.
    pub fn validity_duration(&self) -> u32 {
        self.validity
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        unix((i64::from(self.signing_date) + i64::from(self.validity)) * EXPIRY_FACTOR)
    }

    /// Valid from the signing date up to, but excluding, the expiry.
    pub fn is_valid_at(&self, t: DateTime<Utc>) -> bool {
        t >= self.signing_date() && t < self.expiry()
    }

    pub fn is_expired(&self) -> bool {
        self.expiry() <= Utc::now()
    }

    pub fn key_counter(&self) -> u16 {
        self.key_counter
    }

    pub fn credential_type_reference(&self) -> CredentialTypeReference {
        self.credential_type
    }

    /// Resolve the credential type. `None` if the configuration doesn't know it.
    pub fn credential_type<'c>(&self, conf: &'c Configuration) -> Option<&'c CredentialType> {
        match self.credential_type {
            CredentialTypeReference::Hash(hash) => conf.credential_type_by_hash(&hash),
            CredentialTypeReference::Index(index) => conf.credential_type_by_index(index),
        }
    }

    pub fn set_credential_type(&mut self, ct: &CredentialType) -> Result<(), MetadataError> {
        self.credential_type = match self.layout() {
            MetadataLayout::Hashed => CredentialTypeReference::Hash(credential_type_hash(&ct.identifier())),
            MetadataLayout::Indexed => CredentialTypeReference::Index(
                ct.index
                    .ok_or_else(|| MetadataError::MissingIndex(ct.identifier()))?,
            ),
        };
        Ok(())
    }

    pub fn set_key_counter(&mut self, counter: u16) {
        self.key_counter = counter;
    }

    pub fn set_signing_date(&mut self, date: DateTime<Utc>) -> Result<(), MetadataError> {
        let weeks = date.timestamp().div_euclid(EXPIRY_FACTOR);
        self.signing_date = u32::try_from(weeks).map_err(|_| MetadataError::Overflow("signing date"))?;
        Ok(())
    }

    pub fn set_validity_duration(&mut self, weeks: u32) {
        self.validity = weeks;
    }

    /// Set the validity so that the credential expires at the first week
    /// boundary at or after `expiry`.
    pub fn set_expiry(&mut self, expiry: DateTime<Utc>) -> Result<(), MetadataError> {
        let signing = i64::from(self.signing_date) * EXPIRY_FACTOR;
        let seconds = (expiry.timestamp() - signing).max(0);
        let weeks = (seconds + EXPIRY_FACTOR - 1) / EXPIRY_FACTOR;
        self.validity = u32::try_from(weeks).map_err(|_| MetadataError::Overflow("validity"))?;
        Ok(())
    }
}

fn unix(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
}

fn be_uint(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn put_uint(out: &mut Vec<u8>, value: u32, len: usize, field: &'static str) -> Result<(), MetadataError> {
    if len < 4 && value >> (8 * len) != 0 {
        return Err(MetadataError::Overflow(field));
    }
    out.extend_from_slice(&value.to_be_bytes()[4 - len..]);
    Ok(())
}

// version 1 | signing date 3 | validity 2 | key counter 2 | hash 16
fn decode_hashed(bytes: &[u8]) -> MetadataAttribute {
    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[8..24]);
    MetadataAttribute {
        version: bytes[0],
        signing_date: be_uint(&bytes[1..4]),
        validity: be_uint(&bytes[4..6]),
        key_counter: be_uint(&bytes[6..8]) as u16,
        credential_type: CredentialTypeReference::Hash(hash),
    }
}

fn encode_hashed(m: &MetadataAttribute) -> Result<Vec<u8>, MetadataError> {
    let CredentialTypeReference::Hash(hash) = m.credential_type else {
        return Err(MetadataError::UnsupportedVersion(m.version));
    };
    let mut out = Vec::with_capacity(HASHED_LEN);
    out.push(m.version);
    put_uint(&mut out, m.signing_date, 3, "signing date")?;
    put_uint(&mut out, m.validity, 2, "validity")?;
    put_uint(&mut out, u32::from(m.key_counter), 2, "key counter")?;
    out.extend_from_slice(&hash);
    Ok(out)
}

// version 1 | signing date 3 | validity 3 | key counter 2 | index 4
fn decode_indexed(bytes: &[u8]) -> MetadataAttribute {
    MetadataAttribute {
        version: bytes[0],
        signing_date: be_uint(&bytes[1..4]),
        validity: be_uint(&bytes[4..7]),
        key_counter: be_uint(&bytes[7..9]) as u16,
        credential_type: CredentialTypeReference::Index(be_uint(&bytes[9..13])),
    }
}

fn encode_indexed(m: &MetadataAttribute) -> Result<Vec<u8>, MetadataError> {
    let CredentialTypeReference::Index(index) = m.credential_type else {
        return Err(MetadataError::UnsupportedVersion(m.version));
    };
    let mut out = Vec::with_capacity(INDEXED_LEN);
    out.push(m.version);
    put_uint(&mut out, m.signing_date, 3, "signing date")?;
    put_uint(&mut out, m.validity, 3, "validity")?;
    put_uint(&mut out, u32::from(m.key_counter), 2, "key counter")?;
    put_uint(&mut out, index, 4, "credential type index")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // metadata of a studentCard taken from a real credential
    const STUDENT_CARD: &str = "49043481832371145193140299771658227036446546573739245068";

    #[test]
    fn decodes_hashed_layout() {
        let m = MetadataAttribute::from_int(&Int::from_decimal(STUDENT_CARD).unwrap()).unwrap();
        assert_eq!(m.version(), 0x02);
        assert_eq!(m.signing_date().timestamp(), 1499904000);
        assert_eq!(m.expiry().timestamp(), 1516233600);
        assert_eq!(m.validity_duration(), 27);
        assert_eq!(m.key_counter(), 2);
        assert_eq!(
            m.credential_type_reference(),
            CredentialTypeReference::Hash(credential_type_hash(&"irma-demo.RU.studentCard".into()))
        );
        assert_eq!(m.to_int().unwrap().to_decimal(), STUDENT_CARD);
    }

    #[test]
    fn expiry_is_exclusive() {
        let m = MetadataAttribute::from_int(&Int::from_decimal(STUDENT_CARD).unwrap()).unwrap();
        let second = chrono::Duration::seconds(1);
        assert!(m.is_valid_at(m.signing_date()));
        assert!(!m.is_valid_at(m.signing_date() - second));
        assert!(m.is_valid_at(m.expiry() - second));
        assert!(!m.is_valid_at(m.expiry()));
    }

    #[test]
    fn new_metadata() {
        let m = MetadataAttribute::new(0x02).unwrap();
        assert_eq!(m.version(), 0x02);
        assert_eq!(m.key_counter(), 0);
        assert_eq!(
            m.expiry().timestamp(),
            m.signing_date().timestamp() + i64::from(m.validity_duration()) * EXPIRY_FACTOR
        );
        assert!(m.is_valid_at(Utc::now()));
        assert!(MetadataAttribute::new(0x01).is_err());
    }

    #[test]
    fn indexed_layout() {
        let mut m = MetadataAttribute::new(0x04).unwrap();
        m.set_key_counter(3);
        m.set_validity_duration(70_000);
        m.credential_type = CredentialTypeReference::Index(0x0102_0304);
        let int = m.to_int().unwrap();
        assert_eq!(int.to_bytes_be().len(), INDEXED_LEN);
        assert_eq!(MetadataAttribute::from_int(&int).unwrap(), m);

        // the same validity does not fit the hashed layout
        let mut hashed = MetadataAttribute::new(0x03).unwrap();
        hashed.set_validity_duration(70_000);
        assert_eq!(hashed.to_int(), Err(MetadataError::Overflow("validity")));
    }

    #[test]
    fn rejects_unknown_or_truncated() {
        assert_eq!(
            MetadataAttribute::from_int(&Int::from_u64(0x0900)),
            Err(MetadataError::UnsupportedVersion(0x09))
        );
        assert!(matches!(
            MetadataAttribute::from_int(&Int::from_u64(0x0203)),
            Err(MetadataError::Length { expected: 24, found: 2, .. })
        ));
        assert!(MetadataAttribute::from_int(&Int::zero()).is_err());
    }

    #[test]
    fn set_expiry_rounds_up_to_weeks() {
        let mut m = MetadataAttribute::new(0x03).unwrap();
        let expiry = m.signing_date() + chrono::Duration::days(10);
        m.set_expiry(expiry).unwrap();
        assert_eq!(m.validity_duration(), 2);
        assert!(m.expiry() >= expiry);
    }
}
