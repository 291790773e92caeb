//! Ledger account snapshots
//!
//! A `LedgerAccountState` is what the ledger reports for one account at one
//! point in time. Snapshots are read-only and never cached across calls.

use crate::core::amount::{balance_to_f64, parse_amount, AmountError};
use crate::core::asset::Asset;
use crate::core::operation::ThresholdCategory;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Issuer account flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct AccountFlags: u32 {
        const AUTH_REQUIRED = 0x1;
        const AUTH_REVOCABLE = 0x2;
        const AUTH_IMMUTABLE = 0x4;
        const AUTH_CLAWBACK_ENABLED = 0x8;
    }
}

/// One balance line of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: Asset,
    /// Decimal string
    pub balance: String,
    /// Trustline limit; `None` for the native balance
    pub limit: Option<String>,
    /// Whether the issuer currently authorizes this trustline
    #[serde(default = "default_authorized")]
    pub authorized: bool,
}

fn default_authorized() -> bool {
    true
}

impl Balance {
    pub fn amount(&self) -> f64 {
        balance_to_f64(&self.balance)
    }
}

/// Weight thresholds per operation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

impl Thresholds {
    pub fn new(low: u8, medium: u8, high: u8) -> Self {
        Self { low, medium, high }
    }

    /// Threshold for a category
    pub fn for_category(&self, category: ThresholdCategory) -> u8 {
        match category {
            ThresholdCategory::Low => self.low,
            ThresholdCategory::Medium => self.medium,
            ThresholdCategory::High => self.high,
        }
    }
}

/// A key allowed to sign for an account, with its weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSigner {
    pub key: String,
    pub weight: u8,
}

/// Snapshot of an account as reported by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccountState {
    pub account_id: String,
    pub sequence: i64,
    pub balances: Vec<Balance>,
    pub thresholds: Thresholds,
    /// Includes the master key with its current weight
    pub signers: Vec<AccountSigner>,
    #[serde(default)]
    pub flags: AccountFlags,
    #[serde(default)]
    pub home_domain: Option<String>,
}

impl LedgerAccountState {
    /// Balance line for an asset, if the account holds it
    pub fn balance_for(&self, asset: &Asset) -> Option<&Balance> {
        self.balances.iter().find(|b| &b.asset == asset)
    }

    /// Exact balance of an asset in stroops; absent lines count as zero
    pub fn stroops_of(&self, asset: &Asset) -> Result<i64, AmountError> {
        match self.balance_for(asset) {
            Some(line) => parse_amount(&line.balance),
            None => Ok(0),
        }
    }

    /// Balance of an asset as a float; absent lines count as zero
    pub fn balance_of(&self, asset: &Asset) -> f64 {
        self.balance_for(asset).map(Balance::amount).unwrap_or(0.0)
    }

    /// Native balance as a float
    pub fn native_balance(&self) -> f64 {
        self.balance_of(&Asset::Native)
    }

    /// Non-native balance lines (trustlines)
    pub fn trustlines(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(|b| !b.asset.is_native())
    }

    /// Weight of a signing key on this account; unknown keys weigh zero
    pub fn signer_weight(&self, key: &str) -> u8 {
        self.signers
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.weight)
            .unwrap_or(0)
    }
}

/// Native balance as a float from a bare balance list
pub fn native_balance(balances: &[Balance]) -> f64 {
    balances
        .iter()
        .find(|b| b.asset.is_native())
        .map(Balance::amount)
        .unwrap_or(0.0)
}
