//! Issuer intents: issuance, clawback and trustline authorization

use crate::core::{AccountFlags, Asset, FeeLevel, Operation, SetOptions};
use crate::engine::assembler::TransactionAssembler;
use crate::engine::error::EngineError;
use crate::engine::events::EngineEvent;
use crate::engine::outcome::{ClawbackAllOutcome, SubmissionOutcome};

/// Holders fetched per clawback-all page
pub const CLAWBACK_PAGE_SIZE: usize = 90;

impl TransactionAssembler {
    fn issuer_id(&self) -> Result<String, EngineError> {
        Ok(self
            .configured_role(self.settings.issuer.as_ref(), "payments.create_by")?
            .public_key()
            .to_string())
    }

    /// Issue `code` from `issuer` (default: the issuer role) with revocable
    /// and clawback-enabled flags. When a distributor other than the issuer
    /// is configured, it trusts the asset and receives `amount`.
    pub async fn issue_asset(
        &self,
        code: &str,
        amount: &str,
        issuer: Option<&str>,
    ) -> Result<SubmissionOutcome, EngineError> {
        let issuer = match issuer {
            Some(id) => {
                Self::check_account_id(id)?;
                id.to_string()
            }
            None => self.issuer_id()?,
        };
        let asset = Asset::credit(code, &issuer)?;
        let distributor = match &self.settings.distributor {
            Some(role) => Some(self.directory.require(role)?.public_key().to_string()),
            None => None,
        }
        .filter(|id| *id != issuer);
        let amount = match distributor {
            Some(_) => Some(Self::positive_amount(amount)?.0),
            None => None,
        };

        let fee = self.fee(FeeLevel::Base).await;
        let state = self.load(&issuer).await?;
        if self.ledger.asset_exists(&asset).await? {
            return Err(EngineError::AssetAlreadyExists(asset.to_string()));
        }
        log::info!("Issuing {}", asset);

        let mut builder = self
            .builder(&state, fee)
            .add_operation(Operation::set_options(SetOptions {
                set_flags: Some(AccountFlags::AUTH_REVOCABLE),
                ..Default::default()
            }))
            .add_operation(Operation::set_options(SetOptions {
                set_flags: Some(AccountFlags::AUTH_CLAWBACK_ENABLED),
                ..Default::default()
            }));
        if let (Some(distributor), Some(amount)) = (&distributor, &amount) {
            builder = builder
                .add_operation(Operation::change_trust(asset.clone()).with_source(distributor))
                .add_operation(Operation::payment(distributor, asset.clone(), amount));
        }
        let tx = builder.set_timeout(self.settings.admin_timeout).build()?;

        let outcome = self.finalize(tx, &[], false).await?;
        self.publish(&outcome, |hash| EngineEvent::AssetIssued {
            asset: asset.to_string(),
            hash,
        });
        Ok(outcome)
    }

    /// Claw `amount` of the issuer's `code` back from `holder`
    pub async fn clawback(
        &self,
        holder: &str,
        code: &str,
        amount: &str,
    ) -> Result<SubmissionOutcome, EngineError> {
        Self::check_account_id(holder)?;
        let issuer = self.issuer_id()?;
        let asset = Asset::credit(code, &issuer)?;
        let (amount, _) = Self::positive_amount(amount)?;

        let fee = self.fee(FeeLevel::Max).await;
        let state = self.load(&issuer).await?;
        let tx = self
            .builder(&state, fee)
            .add_operation(Operation::clawback(asset.clone(), holder, &amount))
            .set_timeout(self.settings.admin_timeout)
            .build()?;

        let outcome = self.finalize(tx, &[], false).await?;
        self.publish(&outcome, |hash| EngineEvent::AssetClawedBack {
            asset: asset.to_string(),
            holders: 1,
            hash,
        });
        Ok(outcome)
    }

    /// Claw the issuer's `code` back from every holder, one transaction per
    /// page of holders with a non-zero balance.
    ///
    /// The issuer's sequence is tracked locally across pages and reloaded
    /// after a rejection.
    pub async fn clawback_all(&self, code: &str) -> Result<ClawbackAllOutcome, EngineError> {
        let issuer = self.issuer_id()?;
        let asset = Asset::credit(code, &issuer)?;

        let fee = self.fee(FeeLevel::Max).await;
        let mut issuer_state = self.load(&issuer).await?;
        let mut cursor: Option<String> = None;
        let mut pages = Vec::new();
        let mut first_page = true;

        loop {
            let page = self
                .ledger
                .accounts_by_asset(&asset, cursor.as_deref(), CLAWBACK_PAGE_SIZE)
                .await?;
            if page.records.is_empty() {
                if first_page {
                    log::info!("No accounts hold {}", asset);
                    return Ok(ClawbackAllOutcome::NoAccountsFound);
                }
                break;
            }
            first_page = false;

            let ops: Vec<Operation> = page
                .records
                .iter()
                .filter(|record| record.account_id != issuer)
                .filter_map(|record| {
                    let line = record.balance_for(&asset)?;
                    (line.amount() > 0.0).then(|| {
                        Operation::clawback(asset.clone(), &record.account_id, &line.balance)
                    })
                })
                .collect();

            if !ops.is_empty() {
                let holders = ops.len();
                log::info!("Clawing {} back from {} holders", asset, holders);
                let tx = self
                    .builder(&issuer_state, fee)
                    .add_operations(ops)
                    .set_timeout(self.settings.admin_timeout)
                    .build()?;

                let outcome = self.finalize(tx, &[], false).await?;
                match &outcome {
                    SubmissionOutcome::Rejected { .. } => {
                        issuer_state = self.load(&issuer).await?;
                    }
                    _ => issuer_state.sequence += 1,
                }
                self.publish(&outcome, |hash| EngineEvent::AssetClawedBack {
                    asset: asset.to_string(),
                    holders,
                    hash,
                });
                pages.push(outcome);
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(ClawbackAllOutcome::Processed { pages })
    }

    /// Authorize or revoke `trustor`'s trustline to the issuer's `code`
    pub async fn set_trustline_authorization(
        &self,
        trustor: &str,
        code: &str,
        authorize: bool,
    ) -> Result<SubmissionOutcome, EngineError> {
        Self::check_account_id(trustor)?;
        let issuer = self.issuer_id()?;
        // Validates the code
        Asset::credit(code, &issuer)?;

        let fee = self.fee(FeeLevel::Base).await;
        let state = self.load(&issuer).await?;
        let tx = self
            .builder(&state, fee)
            .add_operation(Operation::allow_trust(trustor, code, authorize))
            .set_timeout(self.settings.admin_timeout)
            .build()?;

        let outcome = self.finalize(tx, &[], false).await?;
        self.publish(&outcome, |hash| EngineEvent::TrustlineAuthorized {
            trustor: trustor.to_string(),
            asset_code: code.to_string(),
            authorize,
            hash,
        });
        Ok(outcome)
    }
}
