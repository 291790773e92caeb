//! Ledger client port
//!
//! Everything the engine needs from the outside world goes through
//! `LedgerClient`. Implementations must be shareable across tasks.

use crate::core::{Asset, FeeStats, LedgerAccountState, Network, TransactionEnvelope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a ledger client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// The ledger refused the transaction; carries the result code
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Malformed envelope: {0}")]
    Malformed(String),
    #[error("Faucet not available on {0}")]
    FaucetUnavailable(Network),
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Acknowledgement of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Hex hash of the submitted envelope
    pub hash: String,
    /// Ledger number the transaction was applied in
    pub ledger: u32,
}

/// One page of accounts holding an asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountsPage {
    pub records: Vec<LedgerAccountState>,
    /// Cursor for the following page; `None` once the listing is exhausted
    pub next_cursor: Option<String>,
}

/// Ledger access used by the engine
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current state of an account, or `None` if it does not exist
    async fn load_account(&self, account_id: &str)
        -> Result<Option<LedgerAccountState>, LedgerError>;

    /// Recent per-operation fee reference points
    async fn fee_stats(&self) -> Result<FeeStats, LedgerError>;

    /// Submit a signed envelope
    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitReceipt, LedgerError>;

    /// Accounts holding a trustline to `asset`, ordered by account id.
    /// `cursor` is the last account id of the previous page.
    async fn accounts_by_asset(
        &self,
        asset: &Asset,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<AccountsPage, LedgerError>;

    /// Whether any account trusts this asset
    async fn asset_exists(&self, asset: &Asset) -> Result<bool, LedgerError>;

    /// Create and fund an account (test network only)
    async fn fund_via_faucet(&self, account_id: &str) -> Result<(), LedgerError>;
}
