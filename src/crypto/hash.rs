//! Hashing utilities for the ledger
//!
//! Provides SHA-256 based hashing used for network identifiers,
//! transaction hashes and base58check checksums.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
/// Used for base58check checksums
pub fn double_sha256(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}

/// Network identifier: SHA-256 of the network passphrase
pub fn network_id(passphrase: &str) -> Vec<u8> {
    sha256(passphrase.as_bytes())
}

/// Hash a payload bound to a network and an envelope tag.
///
/// `sha256(network_id || tag || payload)`; binding the network id prevents a
/// transaction signed for one network from being replayed on another.
pub fn tagged_hash(network_id: &[u8], tag: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(network_id);
    hasher.update(tag);
    hasher.update(payload);
    hasher.finalize().to_vec()
}
