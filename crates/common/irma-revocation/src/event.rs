use irma_crypto::{sha256, Digest256};
use irma_types::Int;
use serde::{Deserialize, Serialize};

/// A single revocation, chained to the event before it.
///
/// `index` is strictly increasing along a chain and the first event of every
/// chain has index 0 and an all-zero parent hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    pub index: u64,
    /// Revocation handle of the revoked credential (`1` for the genesis event).
    pub e: Int,
    pub parent_hash: Digest256,
}

impl Event {
    /// The event that opens a new chain.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            e: Int::from_u64(1),
            parent_hash: Digest256::default(),
        }
    }

    /// Hash committing to the index, the parent and the revoked handle.
    pub fn hash(&self) -> Digest256 {
        sha256([
            self.index.to_be_bytes().as_slice(),
            self.parent_hash.as_bytes().as_slice(),
            self.e.to_bytes_be(),
        ])
    }

    /// Whether `self` directly follows `parent` in a chain.
    pub fn follows(&self, parent: &Event) -> bool {
        parent.index.checked_add(1) == Some(self.index) && self.parent_hash == parent.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chaining() {
        let genesis = Event::genesis();
        let next = Event {
            index: 1,
            e: Int::from_u64(97),
            parent_hash: genesis.hash(),
        };
        assert!(next.follows(&genesis));
        assert!(!genesis.follows(&next));

        let forged = Event {
            parent_hash: Digest256::default(),
            ..next.clone()
        };
        assert!(!forged.follows(&genesis));
        assert_ne!(forged.hash(), next.hash());
    }

    #[test]
    fn wire_names() {
        let json = serde_json::to_value(Event::genesis()).unwrap();
        assert_eq!(json["Index"], 0);
        assert_eq!(json["E"], "AQ==");
        assert!(json["ParentHash"].is_string());
    }
}
