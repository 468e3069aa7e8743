#![allow(dead_code)]

use anyhow::{anyhow, Result};
use irma_crypto::sha256;
use irma_revocation::{Accumulator, SignedAccumulator};
use irma_scheme::{
    encode_attribute, Configuration, ConfigurationOptions, MetadataAttribute, PublicKey,
    CURRENT_METADATA_VERSION,
};
use irma_session::proof::{FIRST_ATTRIBUTE_INDEX, METADATA_INDEX, SECRET_KEY_INDEX};
use irma_session::{NonRevocationProof, ProofD, ProofVerifier};
use irma_types::{CredentialTypeIdentifier, Int};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const TIMESTAMP_SERVER: &str = "https://timestamp.example.org/atum";
pub const TIMESTAMP_SEED: [u8; 32] = [7u8; 32];
pub const REVOCATION_SEED: [u8; 32] = [3u8; 32];

pub fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../../testdata")
        .join(name)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The demo configuration, parsed read-only.
pub fn configuration() -> Result<Configuration> {
    let options = ConfigurationOptions {
        read_only: true,
        ..Default::default()
    };
    let mut conf = Configuration::new(testdata("irma_configuration"), options)?;
    conf.parse_folder()?;
    Ok(conf)
}

fn challenge(key: &PublicKey, context: &Int, nonce: &Int, proof: &ProofD) -> Int {
    let mut parts: Vec<Vec<u8>> = vec![
        key.n.to_bytes_be().to_vec(),
        context.to_bytes_be().to_vec(),
        nonce.to_bytes_be().to_vec(),
        proof.a.to_bytes_be().to_vec(),
        proof.e_response.to_bytes_be().to_vec(),
        proof.v_response.to_bytes_be().to_vec(),
    ];
    for map in [&proof.a_responses, &proof.a_disclosed] {
        for (position, value) in map {
            parts.push(position.to_be_bytes().to_vec());
            parts.push(value.to_bytes_be().to_vec());
        }
    }
    Int::from_bytes_be(sha256(parts).as_bytes())
}

/// Stand-in for the zero-knowledge proof system: a proof is valid when its
/// challenge is the hash of the key, the session binding and everything
/// else in the proof.
pub struct SimulatedProofSystem;

impl ProofVerifier for SimulatedProofSystem {
    fn verify_proofs(&self, proofs: &[ProofD], keys: &[&PublicKey], context: &Int, nonce: &Int) -> bool {
        proofs.len() == keys.len()
            && proofs
                .iter()
                .zip(keys)
                .all(|(proof, key)| proof.c == challenge(key, context, nonce, proof))
    }

    fn verify_non_revocation(&self, proof: &ProofD, accumulator: &Accumulator, _key: &PublicKey) -> bool {
        proof
            .nonrev_proof
            .as_ref()
            .and_then(|p| p.responses.get("nu"))
            .is_some_and(|nu| *nu == accumulator.nu)
    }
}

/// A credential as held by a prover.
pub struct TestCredential {
    pub key: PublicKey,
    pub metadata: Int,
    pub version: u8,
    pub attributes: Vec<Option<String>>,
}

impl TestCredential {
    /// A fresh credential of `typ` under the issuer's latest key.
    pub fn issue(conf: &Configuration, typ: &str, values: &[Option<&str>]) -> Result<Self> {
        let ct = conf
            .credential_type(&CredentialTypeIdentifier::from(typ))
            .ok_or_else(|| anyhow!("unknown credential type {typ}"))?;
        let key = conf
            .latest_public_key(&ct.issuer_identifier())
            .ok_or_else(|| anyhow!("no key for {typ}"))?;
        let mut meta = MetadataAttribute::new(CURRENT_METADATA_VERSION)?;
        meta.set_credential_type(ct)?;
        meta.set_key_counter(key.counter as u16);
        Self::with_metadata(conf, &meta.to_int()?, values)
    }

    /// A credential carrying the given metadata attribute value.
    pub fn with_metadata(conf: &Configuration, metadata: &Int, values: &[Option<&str>]) -> Result<Self> {
        let meta = MetadataAttribute::from_int(metadata)?;
        let key = match meta.credential_type(conf) {
            Some(ct) => conf
                .public_key(&ct.issuer_identifier(), u32::from(meta.key_counter()))?
                .clone(),
            None => conf
                .latest_public_key(&"irma-demo.RU".into())
                .ok_or_else(|| anyhow!("no RU key"))?
                .clone(),
        };
        Ok(Self {
            key,
            metadata: metadata.clone(),
            version: meta.version(),
            attributes: values.iter().map(|v| v.map(str::to_string)).collect(),
        })
    }

    /// Disclose the attributes at `positions` (credential type order),
    /// bound to `context` and `nonce`.
    pub fn prove(&self, positions: &[usize], context: &Int, nonce: &Int) -> ProofD {
        let mut a_responses = BTreeMap::new();
        let mut a_disclosed = BTreeMap::new();
        a_responses.insert(SECRET_KEY_INDEX, Int::from_u64(11));
        a_disclosed.insert(METADATA_INDEX, self.metadata.clone());
        for (i, value) in self.attributes.iter().enumerate() {
            let position = i as u32 + FIRST_ATTRIBUTE_INDEX;
            if positions.contains(&i) {
                a_disclosed.insert(position, encode_attribute(value.as_deref(), self.version));
            } else {
                a_responses.insert(position, Int::from_u64(100 + i as u64));
            }
        }
        let mut proof = ProofD {
            a: Int::from_u64(0xA11CE),
            e_response: Int::from_u64(5),
            v_response: Int::from_u64(6),
            a_responses,
            a_disclosed,
            ..Default::default()
        };
        self.rebind(&mut proof, context, nonce);
        proof
    }

    /// Recompute the challenge of `proof` for another session binding.
    pub fn rebind(&self, proof: &mut ProofD, context: &Int, nonce: &Int) {
        proof.c = challenge(&self.key, context, nonce, proof);
    }
}

/// Attach a non-revocation proof against `accumulator`, claiming value `nu`.
pub fn with_nonrevocation(mut proof: ProofD, accumulator: &SignedAccumulator, nu: &Int) -> ProofD {
    proof.nonrev_proof = Some(NonRevocationProof {
        signed_accumulator: accumulator.clone(),
        responses: BTreeMap::from([("nu".to_string(), nu.clone())]),
    });
    proof
}
