use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{
    Signature, SignatureError as Ed25519SignatureError, Signer, SigningKey, Verifier,
    VerifyingKey,
};
use thiserror::Error;

/// Error types for signature operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Base64 encoding/decoding error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid key length: expected {expected_len} bytes, found {found_len} bytes")]
    InvalidKeyLength { expected_len: usize, found_len: usize },

    #[error("Invalid signature length: expected {expected_len} bytes, found {found_len} bytes")]
    InvalidSignatureLength { expected_len: usize, found_len: usize },

    #[error("Cryptographic signature verification failed: {0}")]
    CryptoVerification(#[from] Ed25519SignatureError),
}

/// Result type for signature operations
pub type Result<T> = std::result::Result<T, CryptoError>;

fn decode_fixed<const N: usize>(encoded: &str, on_len: fn(usize) -> CryptoError) -> Result<[u8; N]> {
    let bytes = STANDARD.decode(encoded.trim())?;
    bytes.as_slice().try_into().map_err(|_| on_len(bytes.len()))
}

/// Decode a base64 Ed25519 public key, as found in a scheme's `pk` file.
pub fn decode_verifying_key(encoded: &str) -> Result<VerifyingKey> {
    let bytes: [u8; 32] = decode_fixed(encoded, |found_len| CryptoError::InvalidKeyLength {
        expected_len: 32,
        found_len,
    })?;
    Ok(VerifyingKey::from_bytes(&bytes)?)
}

pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.as_bytes())
}

/// Decode a base64 Ed25519 secret seed.
pub fn decode_signing_key(encoded: &str) -> Result<SigningKey> {
    let bytes: [u8; 32] = decode_fixed(encoded, |found_len| CryptoError::InvalidKeyLength {
        expected_len: 32,
        found_len,
    })?;
    Ok(SigningKey::from_bytes(&bytes))
}

/// Sign `payload` and return the base64 encoding of the raw signature.
///
/// The payload itself is not embedded; verifiers must hold the exact bytes.
pub fn sign_detached(payload: &[u8], key: &SigningKey) -> String {
    STANDARD.encode(sign_raw(payload, key))
}

/// Sign `payload`, returning the raw 64-byte signature.
pub fn sign_raw(payload: &[u8], key: &SigningKey) -> Vec<u8> {
    key.sign(payload).to_bytes().to_vec()
}

/// Verify a detached base64 signature over `payload`.
pub fn verify_detached(payload: &[u8], signature_b64: &str, key: &VerifyingKey) -> Result<()> {
    let bytes = STANDARD.decode(signature_b64.trim())?;
    verify_raw(payload, &bytes, key)
}

/// Verify a raw 64-byte signature over `payload`.
pub fn verify_raw(payload: &[u8], signature: &[u8], key: &VerifyingKey) -> Result<()> {
    let bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureLength {
            expected_len: 64,
            found_len: signature.len(),
        })?;
    let signature = Signature::from_bytes(&bytes);
    key.verify(payload, &signature).map_err(CryptoError::from)
}
