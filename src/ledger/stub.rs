//! Scripted ledger for engine tests
//!
//! Returns fixed account snapshots and fee stats and records every
//! submitted envelope instead of applying it.

use crate::core::{Asset, FeeStats, LedgerAccountState, TransactionEnvelope};
use crate::ledger::client::{AccountsPage, LedgerClient, LedgerError, SubmitReceipt};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct StubLedger {
    pub accounts: Mutex<HashMap<String, LedgerAccountState>>,
    /// `None` makes `fee_stats` fail
    pub fee_stats: Option<FeeStats>,
    /// Holder pages returned by `accounts_by_asset`, in order
    pub pages: Vec<Vec<LedgerAccountState>>,
    pub existing_assets: Vec<Asset>,
    /// When set, every submission is rejected with this code
    pub reject_with: Option<String>,
    pub submitted: Mutex<Vec<TransactionEnvelope>>,
    pub funded: Mutex<Vec<String>>,
}

impl StubLedger {
    pub fn with_accounts(accounts: Vec<LedgerAccountState>) -> Self {
        Self {
            accounts: Mutex::new(
                accounts
                    .into_iter()
                    .map(|a| (a.account_id.clone(), a))
                    .collect(),
            ),
            fee_stats: Some(FeeStats::default()),
            ..Default::default()
        }
    }

    pub fn insert(&self, account: LedgerAccountState) {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.account_id.clone(), account);
    }

    pub fn submissions(&self) -> Vec<TransactionEnvelope> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for StubLedger {
    async fn load_account(
        &self,
        account_id: &str,
    ) -> Result<Option<LedgerAccountState>, LedgerError> {
        Ok(self.accounts.lock().unwrap().get(account_id).cloned())
    }

    async fn fee_stats(&self) -> Result<FeeStats, LedgerError> {
        self.fee_stats
            .ok_or_else(|| LedgerError::Transport("stub has no fee stats".to_string()))
    }

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitReceipt, LedgerError> {
        if let Some(code) = &self.reject_with {
            return Err(LedgerError::Rejected(code.clone()));
        }
        self.submitted.lock().unwrap().push(envelope.clone());
        Ok(SubmitReceipt {
            hash: envelope
                .hash_hex()
                .map_err(|e| LedgerError::Malformed(e.to_string()))?,
            ledger: 1,
        })
    }

    async fn accounts_by_asset(
        &self,
        _asset: &Asset,
        cursor: Option<&str>,
        _limit: usize,
    ) -> Result<AccountsPage, LedgerError> {
        let index: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let records = self.pages.get(index).cloned().unwrap_or_default();
        Ok(AccountsPage {
            records,
            next_cursor: Some((index + 1).to_string()),
        })
    }

    async fn asset_exists(&self, asset: &Asset) -> Result<bool, LedgerError> {
        Ok(self.existing_assets.contains(asset))
    }

    async fn fund_via_faucet(&self, account_id: &str) -> Result<(), LedgerError> {
        self.funded.lock().unwrap().push(account_id.to_string());
        Ok(())
    }
}
