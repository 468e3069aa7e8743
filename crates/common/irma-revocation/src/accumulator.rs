use crate::{Event, Result};
use chrono::Utc;
use irma_crypto::{sign_detached, verify_detached, Digest256, SigningKey, VerifyingKey};
use irma_types::{encoding::base64_bytes, Int};
use serde::{Deserialize, Serialize};

/// The revocation state of one (credential type, key counter) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Accumulator {
    /// Accumulator value, computed by the proof system.
    pub nu: Int,
    /// Index of the last event folded into this accumulator.
    pub index: u64,
    /// Hash of that event.
    pub event_hash: Digest256,
    /// Unix seconds at which the issuer produced this accumulator.
    pub time: i64,
}

impl Accumulator {
    /// The accumulator reflecting a chain's genesis event.
    pub fn genesis(nu: Int) -> (Self, Event) {
        let event = Event::genesis();
        let acc = Self {
            nu,
            index: event.index,
            event_hash: event.hash(),
            time: Utc::now().timestamp(),
        };
        (acc, event)
    }

    /// Fold one more revocation into the chain. `nu` is the new accumulator
    /// value as computed by the proof system for revocation handle `e`.
    pub fn next(&self, nu: Int, e: Int) -> (Self, Event) {
        let event = Event {
            index: self.index + 1,
            e,
            parent_hash: self.event_hash,
        };
        let acc = Self {
            nu,
            index: event.index,
            event_hash: event.hash(),
            time: Utc::now().timestamp(),
        };
        (acc, event)
    }

    /// Sign this accumulator with the issuer's revocation key.
    pub fn sign(&self, pk_counter: u32, key: &SigningKey) -> Result<SignedAccumulator> {
        let data = serde_json::to_vec(self)?;
        let signature = sign_detached(&data, key);
        Ok(SignedAccumulator {
            data,
            pk_counter,
            signature,
        })
    }
}

/// An accumulator together with the issuer's signature over its encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAccumulator {
    #[serde(rename = "Data", with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(rename = "PKCounter")]
    pub pk_counter: u32,
    #[serde(rename = "Signature")]
    pub signature: String,
}

impl SignedAccumulator {
    /// Check the issuer signature and decode the accumulator.
    pub fn unmarshal_verify(&self, key: &VerifyingKey) -> Result<Accumulator> {
        verify_detached(&self.data, &self.signature, key)?;
        self.accumulator()
    }

    /// Decode without checking the signature. Only for data that was
    /// verified before it was stored.
    pub fn accumulator(&self) -> Result<Accumulator> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RevocationError;
    use assert_matches::assert_matches;

    #[test]
    fn sign_and_verify() {
        let sk = SigningKey::from_bytes(&[3u8; 32]);
        let (acc, _) = Accumulator::genesis(Int::from_u64(12345));
        let signed = acc.sign(2, &sk).unwrap();
        assert_eq!(signed.pk_counter, 2);
        assert_eq!(signed.unmarshal_verify(&sk.verifying_key()).unwrap(), acc);

        let other = SigningKey::from_bytes(&[4u8; 32]);
        assert_matches!(
            signed.unmarshal_verify(&other.verifying_key()),
            Err(RevocationError::Signature(_))
        );
    }

    #[test]
    fn next_links_events() {
        let (acc, genesis) = Accumulator::genesis(Int::from_u64(1));
        let (acc2, event) = acc.next(Int::from_u64(2), Int::from_u64(101));
        assert_eq!(acc2.index, 1);
        assert!(event.follows(&genesis));
        assert_eq!(acc2.event_hash, event.hash());
    }
}
