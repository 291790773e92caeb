//! Engine error taxonomy

use crate::core::{AmountError, AssetError, MemoError, TransactionError};
use crate::directory::DirectoryError;
use crate::ledger::LedgerError;
use thiserror::Error;

/// Errors raised while assembling a transaction.
///
/// Submission failures are not errors: they come back as
/// `SubmissionOutcome::Rejected`.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing role or co-signer mapping; raised before any network call
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid secret")]
    InvalidSecret,
    #[error("Invalid account id: {0}")]
    InvalidAccount(String),
    #[error("Account not found on ledger: {0}")]
    AccountNotFound(String),
    #[error("Insufficient reserve on {account}: headroom {headroom}, need {required}")]
    InsufficientReserve {
        account: String,
        headroom: f64,
        required: f64,
    },
    #[error("Insufficient balance on {account}: {available} {asset}, need {required}")]
    InsufficientBalance {
        account: String,
        asset: String,
        available: String,
        required: String,
    },
    #[error("Asset {0} already exists")]
    AssetAlreadyExists(String),
    #[error(transparent)]
    InvalidMemo(#[from] MemoError),
    #[error(transparent)]
    InvalidAsset(#[from] AssetError),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("No payments to send")]
    NoPayments,
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

impl From<DirectoryError> for EngineError {
    fn from(err: DirectoryError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

impl From<AmountError> for EngineError {
    fn from(err: AmountError) -> Self {
        EngineError::InvalidAmount(err.to_string())
    }
}
