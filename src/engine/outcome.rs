//! Results of assembling a transaction

use crate::core::Transaction;
use crate::crypto::KeyPair;
use crate::ledger::LedgerError;
use serde::Serialize;

/// Why a transaction was handed back instead of submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    /// Tracked signers do not reach a required threshold
    InsufficientSigners,
    /// The caller asked for the signed transaction back
    Deferred,
}

/// Terminal state of one assembled transaction
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// Accepted by the ledger
    Submitted { hash: String, ledger: u32 },
    /// Signed as far as possible and returned for external completion
    Returned {
        /// Base64 envelope
        envelope: String,
        transaction: Box<Transaction>,
        reason: ReturnReason,
    },
    /// Submitted but refused by the ledger
    Rejected { hash: String, error: LedgerError },
}

impl SubmissionOutcome {
    /// Transaction hash, unless the transaction was returned
    pub fn hash(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Submitted { hash, .. } | SubmissionOutcome::Rejected { hash, .. } => {
                Some(hash)
            }
            SubmissionOutcome::Returned { .. } => None,
        }
    }

    pub fn envelope(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Returned { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            SubmissionOutcome::Returned { transaction, .. } => Some(transaction),
            _ => None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmissionOutcome::Submitted { .. })
    }
}

/// Result of clawing an asset back from every holder
#[derive(Debug, Clone)]
pub enum ClawbackAllOutcome {
    /// Nobody holds the asset; no transaction was built
    NoAccountsFound,
    /// One outcome per page that had non-zero holders
    Processed { pages: Vec<SubmissionOutcome> },
}

/// A freshly created account and how its creation went
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub keypair: KeyPair,
    pub outcome: SubmissionOutcome,
}
