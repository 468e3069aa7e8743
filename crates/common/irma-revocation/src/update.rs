use crate::{Accumulator, Event, Result, RevocationError, SignedAccumulator};
use irma_crypto::{SigningKey, VerifyingKey};
use irma_types::Int;
use serde::{Deserialize, Serialize};

/// A freshly signed accumulator and the events needed to reach it from an
/// older state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Update {
    pub signed_accumulator: SignedAccumulator,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Update {
    /// Sign `accumulator` and bundle it with `events`.
    pub fn new(
        key: &SigningKey,
        pk_counter: u32,
        accumulator: &Accumulator,
        events: Vec<Event>,
    ) -> Result<Self> {
        Ok(Self {
            signed_accumulator: accumulator.sign(pk_counter, key)?,
            events,
        })
    }

    /// The first update of a chain: a genesis accumulator with value `nu`
    /// and its genesis event.
    pub fn initial(key: &SigningKey, pk_counter: u32, nu: Int) -> Result<Self> {
        let (acc, event) = Accumulator::genesis(nu);
        Self::new(key, pk_counter, &acc, vec![event])
    }

    pub fn pk_counter(&self) -> u32 {
        self.signed_accumulator.pk_counter
    }

    pub fn first_index(&self) -> Option<u64> {
        self.events.first().map(|e| e.index)
    }

    pub fn last_index(&self) -> Option<u64> {
        self.events.last().map(|e| e.index)
    }

    /// Check that consecutive events follow each other by index and hash.
    pub fn check_chain(&self) -> Result<()> {
        for pair in self.events.windows(2) {
            let (parent, child) = (&pair[0], &pair[1]);
            if parent.index.checked_add(1) != Some(child.index) {
                return Err(RevocationError::NonContiguous {
                    previous: parent.index,
                    found: child.index,
                });
            }
            if child.parent_hash != parent.hash() {
                return Err(RevocationError::BrokenChain { index: child.index });
            }
        }
        Ok(())
    }

    /// Verify the accumulator signature and that the events end exactly at
    /// the signed accumulator.
    pub fn verify(&self, key: &VerifyingKey) -> Result<Accumulator> {
        let acc = self.signed_accumulator.unmarshal_verify(key)?;
        self.check_chain()?;
        if let Some(last) = self.events.last() {
            if last.index != acc.index || last.hash() != acc.event_hash {
                return Err(RevocationError::AccumulatorMismatch {
                    event_index: last.index,
                    accumulator_index: acc.index,
                });
            }
        }
        Ok(acc)
    }
}
