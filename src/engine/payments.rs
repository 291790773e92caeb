//! Payment intents
//!
//! Plain, priority (fee-bumped), admin and swap payments. Every intent
//! funnels through `draft_payments`, which validates balances, bootstraps
//! recipient trustlines and picks up the memo.

use crate::core::{
    format_amount, validate_memo, Asset, FeeLevel, LedgerAccountState, Memo, Operation,
};
use crate::crypto::KeyPair;
use crate::engine::assembler::TransactionAssembler;
use crate::engine::error::EngineError;
use crate::engine::events::EngineEvent;
use crate::engine::fee_bump::FeePayer;
use crate::engine::intent::{AssetAmount, PaymentLine, Recipient, SwapLeg};
use crate::engine::outcome::{ReturnReason, SubmissionOutcome};
use crate::engine::trustline::{TrustlineBootstrapper, TrustlineRequest};
use std::collections::{HashMap, HashSet};

/// Operations and ad-hoc signing keys drafted from payment lines
#[derive(Debug, Default)]
struct PaymentDraft {
    operations: Vec<Operation>,
    memo: Option<Memo>,
    extra_signers: Vec<KeyPair>,
}

/// Fail unless `state` holds at least `required` stroops of `asset`.
/// Issuers pay their own asset out of thin air.
pub(super) fn ensure_balance(
    state: &LedgerAccountState,
    asset: &Asset,
    required: i64,
) -> Result<(), EngineError> {
    if asset.issuer() == Some(state.account_id.as_str()) {
        return Ok(());
    }
    let available = state.stroops_of(asset)?;
    if available < required {
        return Err(EngineError::InsufficientBalance {
            account: state.account_id.clone(),
            asset: asset.to_string(),
            available: format_amount(available),
            required: format_amount(required),
        });
    }
    Ok(())
}

impl TransactionAssembler {
    async fn draft_payments(
        &self,
        sender: &LedgerAccountState,
        lines: &[PaymentLine],
        default_sponsor: Option<&str>,
    ) -> Result<PaymentDraft, EngineError> {
        let mut draft = PaymentDraft::default();
        let mut committed: HashMap<Asset, i64> = HashMap::new();
        let mut bootstrapped: HashSet<(String, Asset)> = HashSet::new();

        for line in lines {
            let asset = Self::resolve_asset(&line.asset)?;
            let (amount, value) = Self::positive_amount(&line.amount)?;

            let spent = committed.entry(asset.clone()).or_insert(0);
            *spent = spent
                .checked_add(value)
                .ok_or_else(|| EngineError::InvalidAmount(line.amount.clone()))?;
            ensure_balance(sender, &asset, *spent)?;

            let (recipient, recipient_key) = match &line.to {
                Recipient::PublicKey(id) => {
                    Self::check_account_id(id)?;
                    (id.clone(), None)
                }
                Recipient::Secret(secret) => {
                    let key = Self::keypair_from_secret(secret)?;
                    (key.account_id(), Some(key))
                }
            };

            // Only a recipient whose key we hold can open a trustline
            if let Some(key) = recipient_key {
                if !asset.is_native() && bootstrapped.insert((recipient.clone(), asset.clone())) {
                    let state = self.load(&recipient).await?;
                    let sponsor = match &line.trustline_sponsor {
                        Some(role) => Some(self.directory.require(role)?.public_key().to_string()),
                        None => default_sponsor.map(str::to_string),
                    };
                    let bootstrap = TrustlineBootstrapper::plan(TrustlineRequest {
                        recipient: &recipient,
                        asset: &asset,
                        balances: &state.balances,
                        sponsor: sponsor.as_deref(),
                    })?;
                    if !bootstrap.is_empty() {
                        draft.extra_signers.push(key);
                    }
                    draft.operations.extend(bootstrap);
                }
            }

            draft
                .operations
                .push(Operation::payment(&recipient, asset, &amount));
            if let Some(memo) = &line.memo {
                draft.memo = Some(validate_memo(memo.clone())?);
            }
        }
        Ok(draft)
    }

    fn payment_sponsor_key(&self) -> Result<Option<String>, EngineError> {
        match &self.settings.payment_sponsor {
            Some(role) => Ok(Some(self.directory.require(role)?.public_key().to_string())),
            None => Ok(None),
        }
    }

    /// Public key of a fee payer; a role must have its secret held
    fn fee_payer_id(&self, payer: &FeePayer) -> Result<String, EngineError> {
        match payer {
            FeePayer::Key(key) => Ok(key.account_id()),
            FeePayer::Role(role) => Ok(self.directory.require_signer(role)?.account_id()),
        }
    }

    async fn pay_from(
        &self,
        source: &str,
        sender_key: Option<KeyPair>,
        lines: &[PaymentLine],
        sponsor: Option<&str>,
        defer: bool,
    ) -> Result<SubmissionOutcome, EngineError> {
        if lines.is_empty() {
            return Err(EngineError::NoPayments);
        }
        log::info!("Assembling {} payments from {}", lines.len(), source);

        let fee = self.fee(FeeLevel::Base).await;
        let state = self.load(source).await?;
        let draft = self.draft_payments(&state, lines, sponsor).await?;

        let mut builder = self
            .builder(&state, fee)
            .add_operations(draft.operations)
            .set_timeout(self.settings.payment_timeout);
        if let Some(memo) = draft.memo {
            builder = builder.add_memo(memo);
        }
        let tx = builder.build()?;

        let mut extra = draft.extra_signers;
        extra.extend(sender_key);
        let outcome = self.finalize(tx, &extra, defer).await?;
        self.publish(&outcome, |hash| EngineEvent::PaymentSent {
            from: source.to_string(),
            payments: lines.len(),
            hash,
        });
        Ok(outcome)
    }

    /// Fee-bump a deferred transaction; anything else passes through
    async fn escalate_deferred(
        &self,
        outcome: SubmissionOutcome,
        payer: &FeePayer,
        fee_source: String,
    ) -> Result<SubmissionOutcome, EngineError> {
        match outcome {
            SubmissionOutcome::Returned {
                transaction,
                reason: ReturnReason::Deferred,
                ..
            } => {
                let outcome = self.escalator.escalate(*transaction, payer).await?;
                self.publish(&outcome, |inner_hash| EngineEvent::FeeBumped {
                    inner_hash,
                    fee_source,
                });
                Ok(outcome)
            }
            other => Ok(other),
        }
    }

    /// Pay from the holder of `from_secret`. With `defer` the signed
    /// transaction is returned instead of submitted.
    pub async fn send_payment(
        &self,
        from_secret: &str,
        lines: &[PaymentLine],
        defer: bool,
    ) -> Result<SubmissionOutcome, EngineError> {
        let sender = Self::keypair_from_secret(from_secret)?;
        let source = sender.account_id();
        let sponsor = self.payment_sponsor_key()?;
        self.pay_from(&source, Some(sender), lines, sponsor.as_deref(), defer)
            .await
    }

    /// Single payment wrapped in a fee bump paid by `fee_payer_role`, or by
    /// the sender when no role is given
    pub async fn send_priority_payment(
        &self,
        from_secret: &str,
        line: PaymentLine,
        fee_payer_role: Option<&str>,
    ) -> Result<SubmissionOutcome, EngineError> {
        let sender = Self::keypair_from_secret(from_secret)?;
        let payer = match fee_payer_role {
            Some(role) => FeePayer::Role(role.to_string()),
            None => FeePayer::Key(sender.clone()),
        };
        let fee_source = self.fee_payer_id(&payer)?;

        let outcome = self
            .send_payment(from_secret, std::slice::from_ref(&line), true)
            .await?;
        self.escalate_deferred(outcome, &payer, fee_source).await
    }

    /// Payments wrapped in a fee bump paid by the holder of
    /// `fee_payer_secret`
    pub async fn send_payment_fee_bump(
        &self,
        from_secret: &str,
        lines: &[PaymentLine],
        fee_payer_secret: &str,
    ) -> Result<SubmissionOutcome, EngineError> {
        let payer = FeePayer::Key(Self::keypair_from_secret(fee_payer_secret)?);
        let fee_source = self.fee_payer_id(&payer)?;

        let outcome = self.send_payment(from_secret, lines, true).await?;
        self.escalate_deferred(outcome, &payer, fee_source).await
    }

    /// Payments from the distributor role. Trustline top-ups come from the
    /// payment sponsor role, else from the distributor itself.
    pub async fn send_admin_payment(
        &self,
        lines: &[PaymentLine],
        defer: bool,
    ) -> Result<SubmissionOutcome, EngineError> {
        let source = self
            .configured_role(self.settings.distributor.as_ref(), "payments.pay_by")?
            .public_key()
            .to_string();
        let sponsor = self
            .payment_sponsor_key()?
            .unwrap_or_else(|| source.clone());
        self.pay_from(&source, None, lines, Some(&sponsor), defer)
            .await
    }

    /// Admin payment fee-bumped by the distributor role
    pub async fn send_admin_priority_payment(
        &self,
        lines: &[PaymentLine],
    ) -> Result<SubmissionOutcome, EngineError> {
        let role = self
            .configured_role(self.settings.distributor.as_ref(), "payments.pay_by")?
            .role()
            .to_string();
        let payer = FeePayer::Role(role);
        let fee_source = self.fee_payer_id(&payer)?;

        let outcome = self.send_admin_payment(lines, true).await?;
        self.escalate_deferred(outcome, &payer, fee_source).await
    }

    /// Atomic two-way payment; both parties sign
    pub async fn swap_payment(
        &self,
        sender: &SwapLeg,
        recipient: &SwapLeg,
    ) -> Result<SubmissionOutcome, EngineError> {
        let sender_key = Self::keypair_from_secret(&sender.from_secret)?;
        let recipient_key = Self::keypair_from_secret(&recipient.from_secret)?;
        let sender_id = sender_key.account_id();
        let recipient_id = recipient_key.account_id();

        let sent_asset = Self::resolve_asset(&sender.asset)?;
        let returned_asset = Self::resolve_asset(&recipient.asset)?;
        let (sent_amount, sent_value) = Self::positive_amount(&sender.amount)?;
        let (returned_amount, _) = Self::positive_amount(&recipient.amount)?;
        log::info!("Assembling swap between {} and {}", sender_id, recipient_id);

        let fee = self.fee(FeeLevel::Max).await;
        let state = self.load(&sender_id).await?;
        ensure_balance(&state, &sent_asset, sent_value)?;

        let mut builder = self
            .builder(&state, fee)
            .add_operation(Operation::payment(&recipient_id, sent_asset, &sent_amount))
            .add_operation(
                Operation::payment(&sender_id, returned_asset, &returned_amount)
                    .with_source(&recipient_id),
            )
            .set_timeout(self.settings.payment_timeout);
        if let Some(memo) = &sender.memo {
            builder = builder.add_memo(validate_memo(memo.clone())?);
        }
        let tx = builder.build()?;

        let outcome = self
            .finalize(tx, &[sender_key, recipient_key], false)
            .await?;
        self.publish(&outcome, |hash| EngineEvent::SwapExecuted { hash });
        Ok(outcome)
    }

    /// Distributor pays the user (opening the user's trustline if needed)
    /// and the user pays the distributor back in one transaction
    pub async fn admin_swap(
        &self,
        app_sends: &AssetAmount,
        user_sends: &AssetAmount,
        user_secret: &str,
    ) -> Result<SubmissionOutcome, EngineError> {
        let distributor = self
            .configured_role(self.settings.distributor.as_ref(), "payments.pay_by")?
            .public_key()
            .to_string();
        let user = Self::keypair_from_secret(user_secret)?;
        let user_id = user.account_id();

        let app_asset = Self::resolve_asset(&app_sends.asset)?;
        let user_asset = Self::resolve_asset(&user_sends.asset)?;
        let (app_amount, app_value) = Self::positive_amount(&app_sends.amount)?;
        let (user_amount, user_value) = Self::positive_amount(&user_sends.amount)?;
        let sponsor = self
            .payment_sponsor_key()?
            .unwrap_or_else(|| distributor.clone());
        log::info!("Assembling admin swap with {}", user_id);

        let fee = self.fee(FeeLevel::Max).await;
        let distributor_state = self.load(&distributor).await?;
        ensure_balance(&distributor_state, &app_asset, app_value)?;
        let user_state = self.load(&user_id).await?;
        ensure_balance(&user_state, &user_asset, user_value)?;

        let mut ops = TrustlineBootstrapper::plan(TrustlineRequest {
            recipient: &user_id,
            asset: &app_asset,
            balances: &user_state.balances,
            sponsor: Some(&sponsor),
        })?;
        ops.push(Operation::payment(&user_id, app_asset, &app_amount));
        ops.push(Operation::payment(&distributor, user_asset, &user_amount).with_source(&user_id));

        let tx = self
            .builder(&distributor_state, fee)
            .add_operations(ops)
            .set_timeout(self.settings.payment_timeout)
            .build()?;
        let outcome = self.finalize(tx, &[user], false).await?;
        self.publish(&outcome, |hash| EngineEvent::SwapExecuted { hash });
        Ok(outcome)
    }
}
