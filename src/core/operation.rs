//! Ledger operations
//!
//! `OperationBody` is a closed set of variants; threshold category and
//! display kind are exhaustive matches over it, so adding a variant forces
//! every lookup to be revisited.

use crate::core::account::AccountFlags;
use crate::core::asset::Asset;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier of an operation; selects which account threshold applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdCategory {
    Low,
    Medium,
    High,
}

impl fmt::Display for ThresholdCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdCategory::Low => write!(f, "low"),
            ThresholdCategory::Medium => write!(f, "medium"),
            ThresholdCategory::High => write!(f, "high"),
        }
    }
}

/// Adds, reweights or (weight 0) removes a signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerUpdate {
    pub key: String,
    pub weight: u8,
}

/// Fields of a set-options operation; unset fields are left untouched
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetOptions {
    pub set_flags: Option<AccountFlags>,
    pub clear_flags: Option<AccountFlags>,
    pub master_weight: Option<u8>,
    pub low_threshold: Option<u8>,
    pub med_threshold: Option<u8>,
    pub high_threshold: Option<u8>,
    pub home_domain: Option<String>,
    pub signer: Option<SignerUpdate>,
}

impl SetOptions {
    /// Whether this changes who may sign or how much they weigh
    pub fn touches_authority(&self) -> bool {
        self.signer.is_some()
            || self.master_weight.is_some()
            || self.low_threshold.is_some()
            || self.med_threshold.is_some()
            || self.high_threshold.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationBody {
    CreateAccount {
        destination: String,
        starting_balance: String,
    },
    Payment {
        destination: String,
        asset: Asset,
        amount: String,
    },
    ChangeTrust {
        asset: Asset,
        /// `None` means the maximum limit; `"0"` removes the trustline
        limit: Option<String>,
    },
    SetOptions(SetOptions),
    Clawback {
        asset: Asset,
        from: String,
        amount: String,
    },
    AccountMerge {
        destination: String,
    },
    BeginSponsoring {
        sponsored_id: String,
    },
    EndSponsoring,
    AllowTrust {
        trustor: String,
        asset_code: String,
        authorize: bool,
    },
}

/// An operation with an optional explicit source account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Falls back to the transaction source when absent
    pub source: Option<String>,
    pub body: OperationBody,
}

impl Operation {
    pub fn new(body: OperationBody) -> Self {
        Self { source: None, body }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn create_account(destination: &str, starting_balance: &str) -> Self {
        Self::new(OperationBody::CreateAccount {
            destination: destination.to_string(),
            starting_balance: starting_balance.to_string(),
        })
    }

    pub fn payment(destination: &str, asset: Asset, amount: &str) -> Self {
        Self::new(OperationBody::Payment {
            destination: destination.to_string(),
            asset,
            amount: amount.to_string(),
        })
    }

    pub fn change_trust(asset: Asset) -> Self {
        Self::new(OperationBody::ChangeTrust { asset, limit: None })
    }

    pub fn remove_trust(asset: Asset) -> Self {
        Self::new(OperationBody::ChangeTrust {
            asset,
            limit: Some("0".to_string()),
        })
    }

    pub fn set_options(options: SetOptions) -> Self {
        Self::new(OperationBody::SetOptions(options))
    }

    pub fn clawback(asset: Asset, from: &str, amount: &str) -> Self {
        Self::new(OperationBody::Clawback {
            asset,
            from: from.to_string(),
            amount: amount.to_string(),
        })
    }

    pub fn account_merge(destination: &str) -> Self {
        Self::new(OperationBody::AccountMerge {
            destination: destination.to_string(),
        })
    }

    pub fn begin_sponsoring(sponsored_id: &str) -> Self {
        Self::new(OperationBody::BeginSponsoring {
            sponsored_id: sponsored_id.to_string(),
        })
    }

    pub fn end_sponsoring() -> Self {
        Self::new(OperationBody::EndSponsoring)
    }

    pub fn allow_trust(trustor: &str, asset_code: &str, authorize: bool) -> Self {
        Self::new(OperationBody::AllowTrust {
            trustor: trustor.to_string(),
            asset_code: asset_code.to_string(),
            authorize,
        })
    }

    /// Explicit source, else the transaction default
    pub fn effective_source<'a>(&'a self, default_source: &'a str) -> &'a str {
        self.source.as_deref().unwrap_or(default_source)
    }

    /// Threshold category this operation is checked against
    pub fn threshold_category(&self) -> ThresholdCategory {
        match &self.body {
            OperationBody::CreateAccount { .. }
            | OperationBody::Payment { .. }
            | OperationBody::ChangeTrust { .. }
            | OperationBody::Clawback { .. }
            | OperationBody::BeginSponsoring { .. }
            | OperationBody::EndSponsoring => ThresholdCategory::Medium,
            OperationBody::SetOptions(options) => {
                if options.touches_authority() {
                    ThresholdCategory::High
                } else {
                    ThresholdCategory::Medium
                }
            }
            OperationBody::AccountMerge { .. } => ThresholdCategory::High,
            OperationBody::AllowTrust { .. } => ThresholdCategory::Low,
        }
    }

    /// Short name of the variant, used in logs
    pub fn kind(&self) -> &'static str {
        match &self.body {
            OperationBody::CreateAccount { .. } => "create_account",
            OperationBody::Payment { .. } => "payment",
            OperationBody::ChangeTrust { .. } => "change_trust",
            OperationBody::SetOptions(_) => "set_options",
            OperationBody::Clawback { .. } => "clawback",
            OperationBody::AccountMerge { .. } => "account_merge",
            OperationBody::BeginSponsoring { .. } => "begin_sponsoring",
            OperationBody::EndSponsoring => "end_sponsoring",
            OperationBody::AllowTrust { .. } => "allow_trust",
        }
    }
}
