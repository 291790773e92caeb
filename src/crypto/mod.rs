//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing and network-bound transaction hashes
//! - ECDSA key management (secp256k1) with base58check account ids

pub mod hash;
pub mod keys;

pub use hash::{double_sha256, network_id, sha256, tagged_hash};
pub use keys::{
    account_id_from_public_key, is_valid_account_id, public_key_from_account_id, sign_message,
    verify_signature, KeyError, KeyPair,
};
