use anyhow::Result;
use irma_crypto::{SigningKey, VerifyingKey};
use irma_revocation::{Accumulator, Event, RevocationStorage, Update};
use irma_types::{CredentialTypeIdentifier, Int};
use rand::RngCore;
use std::sync::Arc;
use std::thread;

const PK_COUNTER: u32 = 2;

fn credential_type() -> CredentialTypeIdentifier {
    CredentialTypeIdentifier::from("irma-demo.MijnOverheid.root")
}

fn random_int() -> Int {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[0] |= 0x80;
    Int::from_bytes_be(&bytes)
}

/// Extends `update` with three revocations, keeping all of its events.
fn revoke_multiple(sk: &SigningKey, update: &Update) -> Result<Update> {
    let mut acc = update.signed_accumulator.accumulator()?;
    let mut events = update.events.clone();
    for _ in 0..3 {
        let (next, event) = acc.next(random_int(), random_int());
        acc = next;
        events.push(event);
    }
    Ok(Update::new(sk, PK_COUNTER, &acc, events)?)
}

/// Checks `latest` for every count up to `count` and the stored accumulator index.
fn retrieve(store: &RevocationStorage, pk: &VerifyingKey, count: u64, expected_index: u64) -> Result<()> {
    for i in 0..=count {
        let updates = store.latest(&credential_type(), i);
        assert_eq!(updates.len(), 1);
        let update = &updates[&PK_COUNTER];
        assert_eq!(update.events.len() as u64, i);
        update.verify(pk)?;
    }
    let signed = store
        .signed_accumulator(&credential_type(), PK_COUNTER)
        .expect("accumulator stored");
    let acc = signed.unmarshal_verify(pk)?;
    assert_eq!(acc.index, expected_index);
    Ok(())
}

#[test]
fn test_revocation_memory_store() -> Result<()> {
    let store = RevocationStorage::new();
    let sk = SigningKey::from_bytes(&[42u8; 32]);
    let pk = sk.verifying_key();
    let ct = credential_type();

    let update = Update::initial(&sk, PK_COUNTER, random_int())?;
    assert!(store.insert(&ct, &update));
    retrieve(&store, &pk, 0, 0)?;

    // a few revocations on top of the initial event
    let update = revoke_multiple(&sk, &update)?;
    let old_update = update.clone();
    assert!(store.insert(&ct, &update));
    retrieve(&store, &pk, 4, 3)?;

    // an update that starts right after the stored tip
    let mut update = revoke_multiple(&sk, &update)?;
    update.events.drain(..4);
    assert_eq!(update.events[0].index, 4);
    assert!(store.insert(&ct, &update));
    retrieve(&store, &pk, 4, 6)?;

    // too new: leaves a gap after the tip
    let mut update = revoke_multiple(&sk, &update)?;
    update.events.drain(..5);
    assert_eq!(update.events[0].index, 9);
    assert!(!store.insert(&ct, &update));
    retrieve(&store, &pk, 4, 6)?;

    // too old: everything already applied
    assert!(!store.insert(&ct, &old_update));
    retrieve(&store, &pk, 4, 6)?;
    Ok(())
}

#[test]
fn test_insert_is_idempotent() -> Result<()> {
    let store = RevocationStorage::new();
    let sk = SigningKey::from_bytes(&[42u8; 32]);
    let ct = credential_type();

    let initial = Update::initial(&sk, PK_COUNTER, random_int())?;
    let update = revoke_multiple(&sk, &initial)?;
    assert!(store.insert(&ct, &initial));
    assert!(store.insert(&ct, &update));

    let before = store.latest(&ct, u64::MAX);
    assert!(!store.insert(&ct, &update));
    assert!(!store.insert(&ct, &initial));
    assert_eq!(store.latest(&ct, u64::MAX), before);
    Ok(())
}

#[test]
fn test_latest_is_bounded() -> Result<()> {
    let store = RevocationStorage::new();
    let sk = SigningKey::from_bytes(&[42u8; 32]);
    let pk = sk.verifying_key();
    let ct = credential_type();

    let update = revoke_multiple(&sk, &Update::initial(&sk, PK_COUNTER, random_int())?)?;
    store.insert(&ct, &update);
    let stored = store.len(&ct, PK_COUNTER) as u64;
    assert_eq!(stored, 4);

    for i in 0..=stored {
        assert_eq!(store.latest(&ct, i)[&PK_COUNTER].events.len() as u64, i);
    }
    for i in [stored + 1, 1_000, u64::MAX] {
        let latest = store.latest(&ct, i);
        assert_eq!(latest[&PK_COUNTER].events.len() as u64, stored);
        latest[&PK_COUNTER].verify(&pk)?;
    }
    Ok(())
}

#[test]
fn test_rejects_update_from_foreign_chain() -> Result<()> {
    let store = RevocationStorage::new();
    let sk = SigningKey::from_bytes(&[42u8; 32]);
    let ct = credential_type();

    let ours = Update::initial(&sk, PK_COUNTER, random_int())?;
    assert!(store.insert(&ct, &ours));

    // same indices, different history
    let (acc, _) = Accumulator::genesis(random_int());
    let (acc, mut event) = acc.next(random_int(), random_int());
    event.parent_hash = irma_crypto::sha256([b"elsewhere"]);
    let theirs = Update::new(&sk, PK_COUNTER, &acc, vec![event])?;
    assert!(!store.insert(&ct, &theirs));
    assert_eq!(store.tip(&ct, PK_COUNTER), Some(0));

    Ok(())
}

#[test]
fn test_updates_at_maximum_index() -> Result<()> {
    let store = RevocationStorage::new();
    let sk = SigningKey::from_bytes(&[42u8; 32]);
    let ct = credential_type();

    let event = Event {
        index: u64::MAX,
        e: random_int(),
        parent_hash: irma_crypto::sha256([b"parent"]),
    };
    let acc = Accumulator {
        nu: random_int(),
        index: u64::MAX,
        event_hash: event.hash(),
        time: 0,
    };
    let last = Update::new(&sk, PK_COUNTER, &acc, vec![event.clone()])?;
    assert!(store.insert(&ct, &last));
    assert!(!store.insert(&ct, &last));
    assert_eq!(store.tip(&ct, PK_COUNTER), Some(u64::MAX));

    // an event claiming to follow index u64::MAX
    let mut wrapped = last.clone();
    wrapped.events.push(Event {
        index: 0,
        e: random_int(),
        parent_hash: event.hash(),
    });
    assert!(!store.insert(&ct, &wrapped));
    assert_eq!(store.tip(&ct, PK_COUNTER), Some(u64::MAX));
    Ok(())
}

#[test]
fn test_concurrent_inserts_and_reads() -> Result<()> {
    let store = Arc::new(RevocationStorage::new());
    let sk = SigningKey::from_bytes(&[42u8; 32]);
    let pk = sk.verifying_key();
    let ct = credential_type();

    let mut updates = vec![Update::initial(&sk, PK_COUNTER, random_int())?];
    for _ in 0..8 {
        let next = revoke_multiple(&sk, updates.last().expect("non-empty"))?;
        updates.push(next);
    }

    let writers: Vec<_> = updates
        .iter()
        .cloned()
        .map(|update| {
            let store = Arc::clone(&store);
            let ct = ct.clone();
            thread::spawn(move || {
                store.insert(&ct, &update);
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let ct = ct.clone();
            thread::spawn(move || {
                for latest in store.latest(&ct, 5).values() {
                    assert!(latest.verify(&pk).is_ok());
                }
            })
        })
        .collect();
    for handle in writers.into_iter().chain(readers) {
        handle.join().expect("thread panicked");
    }

    // every update carries the full history, so the final one always lands
    store.insert(&ct, updates.last().expect("non-empty"));
    assert_eq!(store.tip(&ct, PK_COUNTER), Some(24));
    Ok(())
}
