//! Transactions and envelopes
//!
//! A transaction is an ordered list of operations under one source account,
//! sequence number, fee and validity window. Order matters: sponsorship
//! brackets and trustline-before-payment pairs are applied as written.
//!
//! - Hash: sha256(network_id || "tx" || canonical JSON without signatures)
//! - Envelope: base64 of canonical JSON including signatures
//! - Fee bump: outer envelope re-pricing an already signed inner transaction

use crate::core::fee::total_fee;
use crate::core::memo::Memo;
use crate::core::network::Network;
use crate::core::operation::Operation;
use crate::crypto::{public_key_from_account_id, tagged_hash, verify_signature, KeyError, KeyPair};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum operations in one transaction
pub const MAX_OPERATIONS: usize = 100;

const TX_TAG: &[u8] = b"tx";
const FEE_BUMP_TAG: &[u8] = b"fee-bump";

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction has no operations")]
    NoOperations,
    #[error("Too many operations: {0} (max {MAX_OPERATIONS})")]
    TooManyOperations(usize),
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

// =============================================================================
// Time Bounds & Signatures
// =============================================================================

/// Validity window in unix seconds; 0 means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min_time: i64,
    pub max_time: i64,
}

impl TimeBounds {
    /// Window closing `timeout_secs` from now
    pub fn with_timeout(timeout_secs: i64) -> Self {
        if timeout_secs <= 0 {
            return Self::default();
        }
        Self {
            min_time: 0,
            max_time: Utc::now().timestamp() + timeout_secs,
        }
    }

    pub fn contains(&self, now: i64) -> bool {
        (self.min_time == 0 || now >= self.min_time) && (self.max_time == 0 || now <= self.max_time)
    }
}

/// A signature together with the account id that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    pub key: String,
    /// Hex-encoded compact signature
    pub signature: String,
}

impl DecoratedSignature {
    /// Verify this signature against a payload hash
    pub fn verify(&self, hash: &[u8]) -> bool {
        let Ok(public_key) = public_key_from_account_id(&self.key) else {
            return false;
        };
        let Ok(sig) = hex::decode(&self.signature) else {
            return false;
        };
        verify_signature(&public_key, hash, &sig).unwrap_or(false)
    }
}

fn add_signature(
    signatures: &mut Vec<DecoratedSignature>,
    hash: &[u8],
    key_pair: &KeyPair,
) -> Result<(), TransactionError> {
    let key = key_pair.account_id();
    if signatures.iter().any(|s| s.key == key) {
        return Ok(());
    }
    let signature = key_pair.sign(hash)?;
    signatures.push(DecoratedSignature {
        key,
        signature: hex::encode(signature),
    });
    Ok(())
}

// =============================================================================
// Transaction
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub network: Network,
    pub source: String,
    /// Total fee in stroops
    pub fee: u64,
    pub sequence: i64,
    pub time_bounds: TimeBounds,
    pub memo: Memo,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub signatures: Vec<DecoratedSignature>,
}

/// Signed-over view of a transaction (everything but the signatures)
#[derive(Serialize)]
struct TransactionPayload<'a> {
    source: &'a str,
    fee: u64,
    sequence: i64,
    time_bounds: &'a TimeBounds,
    memo: &'a Memo,
    operations: &'a [Operation],
}

impl Transaction {
    /// Hash that signatures commit to
    pub fn hash(&self) -> Result<Vec<u8>, TransactionError> {
        let payload = serde_json::to_vec(&TransactionPayload {
            source: &self.source,
            fee: self.fee,
            sequence: self.sequence,
            time_bounds: &self.time_bounds,
            memo: &self.memo,
            operations: &self.operations,
        })?;
        Ok(tagged_hash(&self.network.id(), TX_TAG, &payload))
    }

    /// Hex transaction hash, as reported after submission
    pub fn hash_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.hash()?))
    }

    /// Add a signature; signing twice with the same key is a no-op
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        let hash = self.hash()?;
        add_signature(&mut self.signatures, &hash, key_pair)
    }

    pub fn is_signed_by(&self, account_id: &str) -> bool {
        self.signatures.iter().any(|s| s.key == account_id)
    }

    /// Base64 envelope for external completion or submission
    pub fn to_envelope(&self) -> Result<String, TransactionError> {
        TransactionEnvelope::Tx(self.clone()).encode()
    }

    /// Account ids an operation in this transaction acts for
    pub fn operation_sources(&self) -> impl Iterator<Item = &str> {
        self.operations
            .iter()
            .map(|op| op.effective_source(&self.source))
    }
}

// =============================================================================
// Fee Bump
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBumpTransaction {
    pub fee_source: String,
    /// Total outer fee in stroops
    pub fee: u64,
    pub inner: Transaction,
    #[serde(default)]
    pub signatures: Vec<DecoratedSignature>,
}

#[derive(Serialize)]
struct FeeBumpPayload<'a> {
    fee_source: &'a str,
    fee: u64,
    inner_hash: String,
}

impl FeeBumpTransaction {
    /// Wrap a signed inner transaction; the outer fee covers the inner
    /// operations plus the bump itself
    pub fn new(fee_source: &str, fee_per_op: u32, inner: Transaction) -> Self {
        let fee = total_fee(fee_per_op, inner.operations.len() + 1);
        Self {
            fee_source: fee_source.to_string(),
            fee,
            inner,
            signatures: Vec::new(),
        }
    }

    pub fn hash(&self) -> Result<Vec<u8>, TransactionError> {
        let payload = serde_json::to_vec(&FeeBumpPayload {
            fee_source: &self.fee_source,
            fee: self.fee,
            inner_hash: self.inner.hash_hex()?,
        })?;
        Ok(tagged_hash(&self.inner.network.id(), FEE_BUMP_TAG, &payload))
    }

    pub fn hash_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.hash()?))
    }

    /// Sign the outer envelope; inner signatures are untouched
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        let hash = self.hash()?;
        add_signature(&mut self.signatures, &hash, key_pair)
    }

    pub fn to_envelope(&self) -> Result<String, TransactionError> {
        TransactionEnvelope::FeeBump(self.clone()).encode()
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// Anything that can be submitted to the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tx", rename_all = "snake_case")]
pub enum TransactionEnvelope {
    Tx(Transaction),
    FeeBump(FeeBumpTransaction),
}

impl TransactionEnvelope {
    pub fn encode(&self) -> Result<String, TransactionError> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }

    pub fn decode(encoded: &str) -> Result<Self, TransactionError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| TransactionError::InvalidEnvelope(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Hash of this envelope (outer hash for fee bumps)
    pub fn hash_hex(&self) -> Result<String, TransactionError> {
        match self {
            TransactionEnvelope::Tx(tx) => tx.hash_hex(),
            TransactionEnvelope::FeeBump(bump) => bump.hash_hex(),
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a transaction against a source account's current sequence
pub struct TransactionBuilder {
    network: Network,
    source: String,
    current_sequence: i64,
    fee_per_op: u32,
    memo: Memo,
    timeout_secs: i64,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    /// `current_sequence` is the source account's sequence on the ledger;
    /// the built transaction uses the next one
    pub fn new(network: Network, source: &str, current_sequence: i64, fee_per_op: u32) -> Self {
        Self {
            network,
            source: source.to_string(),
            current_sequence,
            fee_per_op,
            memo: Memo::None,
            timeout_secs: 0,
            operations: Vec::new(),
        }
    }

    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn add_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations.extend(operations);
        self
    }

    /// Attach a memo; a later memo replaces an earlier one
    pub fn add_memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    /// Validity window in seconds from build time
    pub fn set_timeout(mut self, timeout_secs: i64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn build(self) -> Result<Transaction, TransactionError> {
        if self.operations.is_empty() {
            return Err(TransactionError::NoOperations);
        }
        if self.operations.len() > MAX_OPERATIONS {
            return Err(TransactionError::TooManyOperations(self.operations.len()));
        }

        Ok(Transaction {
            network: self.network,
            fee: total_fee(self.fee_per_op, self.operations.len()),
            source: self.source,
            sequence: self.current_sequence + 1,
            time_bounds: TimeBounds::with_timeout(self.timeout_secs),
            memo: self.memo,
            operations: self.operations,
            signatures: Vec::new(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
