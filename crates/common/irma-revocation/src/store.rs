use crate::{Event, SignedAccumulator, Update};
use irma_types::CredentialTypeIdentifier;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Number of events kept per chain unless configured otherwise.
pub const DEFAULT_MAX_EVENTS: usize = 256;

#[derive(Debug, Clone)]
struct Record {
    signed_accumulator: SignedAccumulator,
    events: VecDeque<Event>,
}

impl Record {
    fn tip(&self) -> Option<&Event> {
        self.events.back()
    }
}

type Chains = HashMap<CredentialTypeIdentifier, BTreeMap<u32, Record>>;

/// In-memory store of the latest signed accumulator and a rolling event log
/// per (credential type, key counter).
///
/// Cloning yields another handle onto the same store. Writers are serialized
/// by the inner lock; readers always see a whole update or none of it.
#[derive(Debug, Clone)]
pub struct RevocationStorage {
    chains: Arc<RwLock<Chains>>,
    max_events: usize,
}

impl Default for RevocationStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RevocationStorage {
    pub fn new() -> Self {
        Self::with_max_events(DEFAULT_MAX_EVENTS)
    }

    /// A store keeping at most `max_events` events per chain (at least one).
    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            chains: Arc::new(RwLock::new(HashMap::new())),
            max_events: max_events.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Chains> {
        self.chains.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Chains> {
        self.chains.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an update that has already been verified against the issuer's
    /// revocation key.
    ///
    /// Returns whether the stored state changed. Updates that cannot be
    /// chained onto the stored events (a gap after the tip, nothing newer
    /// than the tip, a broken hash chain) are ignored, so replaying an
    /// applied update is a no-op.
    pub fn insert(&self, typ: &CredentialTypeIdentifier, update: &Update) -> bool {
        let counter = update.pk_counter();
        let (first, last) = match (update.events.first(), update.events.last()) {
            (Some(first), Some(last)) => (first.index, last.index),
            _ => {
                debug!(credential_type = %typ, counter, "ignoring revocation update without events");
                return false;
            }
        };
        if update.check_chain().is_err() {
            debug!(credential_type = %typ, counter, "ignoring revocation update with broken event chain");
            return false;
        }

        let mut chains = self.write();
        let records = chains.entry(typ.clone()).or_default();
        if !records.contains_key(&counter) {
            let mut events: VecDeque<Event> = update.events.iter().cloned().collect();
            trim(&mut events, self.max_events);
            records.insert(
                counter,
                Record {
                    signed_accumulator: update.signed_accumulator.clone(),
                    events,
                },
            );
            debug!(credential_type = %typ, counter, first, last, "stored first revocation update");
            return true;
        }
        let Some(record) = records.get_mut(&counter) else {
            return false;
        };

        let Some(tip) = record.tip().cloned() else {
            return false;
        };
        if last <= tip.index {
            debug!(credential_type = %typ, counter, tip = tip.index, last, "rejecting revocation update: nothing newer than tip");
            return false;
        }
        // last > tip.index, so the successor of the tip exists
        let next = tip.index + 1;
        if first > next {
            debug!(credential_type = %typ, counter, tip = tip.index, first, "rejecting revocation update: gap after tip");
            return false;
        }

        let skip = (next - first) as usize;
        let suffix = &update.events[skip..];
        if !suffix.first().is_some_and(|next| next.follows(&tip)) {
            debug!(credential_type = %typ, counter, tip = tip.index, "rejecting revocation update: does not extend stored chain");
            return false;
        }

        record.events.extend(suffix.iter().cloned());
        trim(&mut record.events, self.max_events);
        record.signed_accumulator = update.signed_accumulator.clone();
        debug!(credential_type = %typ, counter, tip = last, appended = suffix.len(), "applied revocation update");
        true
    }

    /// For every known key counter of `typ`, an update holding the current
    /// signed accumulator and the last `count` stored events (fewer if fewer
    /// are stored).
    pub fn latest(&self, typ: &CredentialTypeIdentifier, count: u64) -> BTreeMap<u32, Update> {
        let chains = self.read();
        let Some(records) = chains.get(typ) else {
            return BTreeMap::new();
        };
        records
            .iter()
            .map(|(&counter, record)| {
                let take = usize::try_from(count)
                    .unwrap_or(usize::MAX)
                    .min(record.events.len());
                let skip = record.events.len() - take;
                let update = Update {
                    signed_accumulator: record.signed_accumulator.clone(),
                    events: record.events.iter().skip(skip).cloned().collect(),
                };
                (counter, update)
            })
            .collect()
    }

    /// The current signed accumulator for one chain.
    pub fn signed_accumulator(
        &self,
        typ: &CredentialTypeIdentifier,
        counter: u32,
    ) -> Option<SignedAccumulator> {
        self.read()
            .get(typ)
            .and_then(|records| records.get(&counter))
            .map(|record| record.signed_accumulator.clone())
    }

    /// Index of the newest stored event of one chain.
    pub fn tip(&self, typ: &CredentialTypeIdentifier, counter: u32) -> Option<u64> {
        self.read()
            .get(typ)
            .and_then(|records| records.get(&counter))
            .and_then(|record| record.tip().map(|e| e.index))
    }

    /// Number of events currently kept for one chain.
    pub fn len(&self, typ: &CredentialTypeIdentifier, counter: u32) -> usize {
        self.read()
            .get(typ)
            .and_then(|records| records.get(&counter))
            .map_or(0, |record| record.events.len())
    }

    pub fn is_empty(&self) -> bool {
        self.read().values().all(BTreeMap::is_empty)
    }
}

fn trim(events: &mut VecDeque<Event>, max: usize) {
    while events.len() > max {
        events.pop_front();
    }
}
