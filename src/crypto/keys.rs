//! ECDSA key management for ledger accounts
//!
//! Key pairs use the secp256k1 curve. Account ids and secrets are
//! base58check strings with distinct version bytes so that one can never
//! be mistaken for the other.

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use thiserror::Error;

use super::hash::{double_sha256, sha256};

/// Version byte prepended to encoded account ids
pub const ACCOUNT_ID_VERSION: u8 = 0x30;

/// Version byte prepended to encoded secrets
pub const SECRET_VERSION: u8 = 0x90;

const CHECKSUM_LEN: usize = 4;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid secret")]
    InvalidSecret,
    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an encoded secret
    pub fn from_secret(secret: &str) -> Result<Self, KeyError> {
        let bytes =
            decode_check(secret, SECRET_VERSION).ok_or(KeyError::InvalidSecret)?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidSecret)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Encoded secret. Keep this out of logs.
    pub fn secret(&self) -> String {
        encode_check(SECRET_VERSION, &self.secret_key.secret_bytes())
    }

    /// Encoded account id (the public identity on the ledger)
    pub fn account_id(&self) -> String {
        account_id_from_public_key(&self.public_key)
    }

    /// Sign a message hash with the private key
    pub fn sign(&self, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.secret_key, message_hash)
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, message_hash: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        verify_signature(&self.public_key, message_hash, signature)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("account_id", &self.account_id())
            .finish_non_exhaustive()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for KeyPair {}

/// Encode a public key as an account id
pub fn account_id_from_public_key(public_key: &PublicKey) -> String {
    encode_check(ACCOUNT_ID_VERSION, &public_key.serialize())
}

/// Parse an account id back into its public key
pub fn public_key_from_account_id(account_id: &str) -> Result<PublicKey, KeyError> {
    let bytes = decode_check(account_id, ACCOUNT_ID_VERSION)
        .ok_or_else(|| KeyError::InvalidAccountId(account_id.to_string()))?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidAccountId(account_id.to_string()))
}

/// Check whether a string is a well-formed account id
pub fn is_valid_account_id(account_id: &str) -> bool {
    public_key_from_account_id(account_id).is_ok()
}

/// Sign a message hash with a secret key
pub fn sign_message(secret_key: &SecretKey, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();

    // Ensure message hash is 32 bytes
    let hash = if message_hash.len() == 32 {
        message_hash.to_vec()
    } else {
        sha256(message_hash)
    };

    let message = Message::from_digest_slice(&hash)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    message_hash: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();

    let hash = if message_hash.len() == 32 {
        message_hash.to_vec()
    } else {
        sha256(message_hash)
    };

    let message = Message::from_digest_slice(&hash)?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature)
        .map_err(|_| KeyError::InvalidSignature)?;

    match secp.verify_ecdsa(&message, &sig, public_key) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// Base58check: version || payload || first 4 bytes of double SHA-256
fn encode_check(version: u8, payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    bytes.push(version);
    bytes.extend_from_slice(payload);
    let checksum = double_sha256(&bytes);
    bytes.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(bytes).into_string()
}

fn decode_check(encoded: &str, version: u8) -> Option<Vec<u8>> {
    let bytes = bs58::decode(encoded).into_vec().ok()?;
    if bytes.len() <= 1 + CHECKSUM_LEN || bytes[0] != version {
        return None;
    }
    let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if double_sha256(body)[..CHECKSUM_LEN] != *checksum {
        return None;
    }
    Some(body[1..].to_vec())
}
