use irma_crypto::{sha256, verify_detached, CryptoError, Digest256, VerifyingKey};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;
use thiserror::Error;

pub const INDEX_FILE: &str = "index";
pub const INDEX_SIGNATURE_FILE: &str = "index.sig";
pub const PUBLIC_KEY_FILE: &str = "pk";

/// Files that are part of a scheme folder but not covered by its index.
pub const UNINDEXED_FILES: [&str; 3] = [PUBLIC_KEY_FILE, INDEX_FILE, INDEX_SIGNATURE_FILE];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("malformed index line {line}: {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("index entry {0} is outside the scheme manager")]
    ForeignPath(String),
}

/// The signed list of `<sha256-hex> <manager>/<path>` entries of one scheme
/// manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeManagerIndex(BTreeMap<String, Digest256>);

impl SchemeManagerIndex {
    /// Parse an index and check that every entry belongs to `manager`.
    pub fn parse(text: &str, manager: &str) -> Result<Self, IndexError> {
        let index: SchemeManagerIndex = text.parse()?;
        let prefix = format!("{manager}/");
        let inside = |path: &str| {
            path.strip_prefix(&prefix)
                .is_some_and(|rel| is_plain_relative(Path::new(rel)))
        };
        if let Some(path) = index.0.keys().find(|p| !inside(p)) {
            return Err(IndexError::ForeignPath(path.clone()));
        }
        Ok(index)
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: &[u8]) {
        self.0.insert(path.into(), sha256([contents]));
    }

    pub fn get(&self, path: &str) -> Option<&Digest256> {
        self.0.get(path)
    }

    /// Whether `contents` is what the index expects at `path`.
    pub fn matches(&self, path: &str, contents: &[u8]) -> bool {
        self.get(path)
            .is_some_and(|expected| *expected == sha256([contents]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Digest256)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for SchemeManagerIndex {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = BTreeMap::new();
        for (n, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let malformed = || IndexError::MalformedLine {
                line: n + 1,
                content: line.to_string(),
            };
            let (hash, path) = line.split_once(' ').ok_or_else(malformed)?;
            let digest = Digest256::from_hex(hash).ok_or_else(malformed)?;
            let path = path.trim();
            if path.is_empty() {
                return Err(malformed());
            }
            entries.insert(path.to_string(), digest);
        }
        Ok(Self(entries))
    }
}

impl fmt::Display for SchemeManagerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (path, digest) in &self.0 {
            writeln!(f, "{} {}", digest.to_hex(), path)?;
        }
        Ok(())
    }
}

/// A non-empty path made of normal components only: no root, prefix, `.`
/// or `..`.
pub fn is_plain_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

/// Check the detached signature over the raw index bytes.
pub fn verify_index_signature(
    index: &[u8],
    signature: &str,
    key: &VerifyingKey,
) -> Result<(), CryptoError> {
    verify_detached(index, signature.trim(), key)
}
