//! Fee-bump escalation
//!
//! Wraps an already signed transaction in an outer envelope paid for by a
//! different key at the ledger's max-fee quote. Inner signatures are left
//! untouched; the reported hash is always the inner one.

use crate::core::{select_fee, FeeBumpTransaction, FeeLevel, Transaction, TransactionEnvelope};
use crate::crypto::KeyPair;
use crate::directory::AccountDirectory;
use crate::engine::error::EngineError;
use crate::engine::outcome::SubmissionOutcome;
use crate::ledger::LedgerClient;
use std::sync::Arc;

/// Who pays for the outer envelope
#[derive(Debug, Clone)]
pub enum FeePayer {
    /// A key supplied by the caller, typically the original sender
    Key(KeyPair),
    /// A directory role whose secret is held
    Role(String),
}

pub struct FeeBumpEscalator {
    directory: Arc<AccountDirectory>,
    ledger: Arc<dyn LedgerClient>,
    fallback_fee: u32,
}

impl FeeBumpEscalator {
    pub fn new(
        directory: Arc<AccountDirectory>,
        ledger: Arc<dyn LedgerClient>,
        fallback_fee: u32,
    ) -> Self {
        Self {
            directory,
            ledger,
            fallback_fee,
        }
    }

    fn payer_key(&self, payer: &FeePayer) -> Result<KeyPair, EngineError> {
        match payer {
            FeePayer::Key(key) => Ok(key.clone()),
            FeePayer::Role(role) => Ok(self.directory.require_signer(role)?.clone()),
        }
    }

    /// Build and sign the outer envelope without submitting it
    pub async fn wrap(
        &self,
        inner: Transaction,
        payer: &FeePayer,
    ) -> Result<FeeBumpTransaction, EngineError> {
        let key = self.payer_key(payer)?;
        let stats = self.ledger.fee_stats().await.ok();
        let fee_per_op = select_fee(stats, FeeLevel::Max, self.fallback_fee);

        let mut bump = FeeBumpTransaction::new(&key.account_id(), fee_per_op, inner);
        bump.sign(&key)?;
        Ok(bump)
    }

    /// Wrap and submit; a ledger refusal comes back as `Rejected`
    pub async fn escalate(
        &self,
        inner: Transaction,
        payer: &FeePayer,
    ) -> Result<SubmissionOutcome, EngineError> {
        let inner_hash = inner.hash_hex()?;
        let bump = self.wrap(inner, payer).await?;
        log::info!(
            "Fee-bumping {} via {} (fee {})",
            inner_hash,
            bump.fee_source,
            bump.fee
        );

        match self.ledger.submit(&TransactionEnvelope::FeeBump(bump)).await {
            Ok(receipt) => Ok(SubmissionOutcome::Submitted {
                hash: inner_hash,
                ledger: receipt.ledger,
            }),
            Err(error) => {
                log::warn!("Fee bump for {} rejected: {}", inner_hash, error);
                Ok(SubmissionOutcome::Rejected {
                    hash: inner_hash,
                    error,
                })
            }
        }
    }
}
