//! Transaction assembler
//!
//! Turns caller intents into ordered operation lists, has the signer
//! resolver sign them and then either submits or hands the envelope back:
//!
//! DRAFTING → OPERATIONS_ATTACHED → BUILT → SIGNED → SUBMITTED
//!                                                 → RETURNED (insufficient
//!                                                   signers or deferred)
//!
//! Intents are split across this file (shared plumbing and account
//! lifecycle), `payments.rs` and `assets.rs`.

use crate::core::{
    amount_from_f64, format_amount, format_f64, parse_amount, select_fee, Asset, AssetResolver,
    Balance, FeeLevel, LedgerAccountState, Network, Operation, SetOptions, Transaction,
    TransactionBuilder, TransactionEnvelope, ADMIN_TIMEOUT_SECS, BASE_FEE, PAYMENT_TIMEOUT_SECS,
};
use crate::crypto::{is_valid_account_id, KeyPair};
use crate::directory::{Account, AccountDirectory};
use crate::engine::error::EngineError;
use crate::engine::events::{EngineEvent, EventBus};
use crate::engine::fee_bump::FeeBumpEscalator;
use crate::engine::outcome::{CreatedAccount, ReturnReason, SubmissionOutcome};
use crate::engine::signers::SignerResolver;
use crate::engine::trustline::TRUSTLINE_RESERVE;
use crate::ledger::LedgerClient;
use std::sync::Arc;

/// Starting balance of a new account before trustline reserves
pub const BASE_STARTING_BALANCE: f64 = 1.0;

/// Resolved engine settings
#[derive(Debug, Clone)]
pub struct AssemblerSettings {
    pub network: Network,
    pub emit_events: bool,
    /// Role that funds new accounts and receives merged ones
    pub account_creator: Option<String>,
    /// Role sponsoring reserves of new accounts
    pub account_sponsor: Option<String>,
    pub starting_balance: Option<String>,
    pub home_domain: Option<String>,
    pub base_trustlines: Vec<Asset>,
    /// Role issuing assets
    pub issuer: Option<String>,
    /// Role distributing assets and paying admin payments
    pub distributor: Option<String>,
    /// Role funding recipient top-ups on admin payments
    pub payment_sponsor: Option<String>,
    pub base_fee: u32,
    pub payment_timeout: i64,
    pub admin_timeout: i64,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            emit_events: false,
            account_creator: None,
            account_sponsor: None,
            starting_balance: None,
            home_domain: None,
            base_trustlines: Vec::new(),
            issuer: None,
            distributor: None,
            payment_sponsor: None,
            base_fee: BASE_FEE,
            payment_timeout: PAYMENT_TIMEOUT_SECS,
            admin_timeout: ADMIN_TIMEOUT_SECS,
        }
    }
}

pub struct TransactionAssembler {
    pub(super) settings: AssemblerSettings,
    pub(super) directory: Arc<AccountDirectory>,
    pub(super) ledger: Arc<dyn LedgerClient>,
    pub(super) resolver: SignerResolver,
    pub(super) escalator: FeeBumpEscalator,
    events: Arc<EventBus>,
}

impl TransactionAssembler {
    /// Every configured role must resolve in the directory
    pub fn new(
        settings: AssemblerSettings,
        directory: Arc<AccountDirectory>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Self, EngineError> {
        for role in [
            &settings.account_creator,
            &settings.account_sponsor,
            &settings.issuer,
            &settings.distributor,
            &settings.payment_sponsor,
        ]
        .into_iter()
        .flatten()
        {
            directory.require(role)?;
        }

        Ok(Self {
            resolver: SignerResolver::new(directory.clone(), ledger.clone()),
            escalator: FeeBumpEscalator::new(directory.clone(), ledger.clone(), settings.base_fee),
            settings,
            directory,
            ledger,
            events: Arc::new(EventBus::new()),
        })
    }

    pub fn settings(&self) -> &AssemblerSettings {
        &self.settings
    }

    pub fn directory(&self) -> &Arc<AccountDirectory> {
        &self.directory
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // =========================================================================
    // Shared plumbing
    // =========================================================================

    pub(super) fn configured_role(
        &self,
        role: Option<&String>,
        setting: &str,
    ) -> Result<&Account, EngineError> {
        let role = role
            .ok_or_else(|| EngineError::Configuration(format!("{} is not configured", setting)))?;
        Ok(self.directory.require(role)?)
    }

    pub(super) fn keypair_from_secret(secret: &str) -> Result<KeyPair, EngineError> {
        KeyPair::from_secret(secret).map_err(|_| EngineError::InvalidSecret)
    }

    pub(super) fn check_account_id(account_id: &str) -> Result<(), EngineError> {
        if is_valid_account_id(account_id) {
            Ok(())
        } else {
            Err(EngineError::InvalidAccount(account_id.to_string()))
        }
    }

    /// Parse a positive amount, returning its canonical string and stroops
    pub(super) fn positive_amount(amount: &str) -> Result<(String, i64), EngineError> {
        let stroops = parse_amount(amount)?;
        if stroops <= 0 {
            return Err(EngineError::InvalidAmount(amount.to_string()));
        }
        Ok((format_amount(stroops), stroops))
    }

    pub(super) fn resolve_asset(identifier: &str) -> Result<Asset, EngineError> {
        Ok(AssetResolver::resolve(identifier)?)
    }

    /// Per-operation fee from ledger stats, falling back to the configured base fee
    pub(super) async fn fee(&self, level: FeeLevel) -> u32 {
        let stats = match self.ledger.fee_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                log::debug!("Fee stats unavailable, using base fee: {}", e);
                None
            }
        };
        select_fee(stats, level, self.settings.base_fee)
    }

    pub(super) async fn load(&self, account_id: &str) -> Result<LedgerAccountState, EngineError> {
        self.ledger
            .load_account(account_id)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(account_id.to_string()))
    }

    pub(super) fn builder(&self, source: &LedgerAccountState, fee: u32) -> TransactionBuilder {
        TransactionBuilder::new(
            self.settings.network,
            &source.account_id,
            source.sequence,
            fee,
        )
    }

    /// Sign with resolved signers, then submit or return
    pub(super) async fn finalize(
        &self,
        mut tx: Transaction,
        extra: &[KeyPair],
        defer: bool,
    ) -> Result<SubmissionOutcome, EngineError> {
        let valid = self.resolver.sign(&mut tx, extra).await?;
        if !valid {
            return Self::returned(tx, ReturnReason::InsufficientSigners);
        }
        if defer {
            return Self::returned(tx, ReturnReason::Deferred);
        }
        self.submit(tx).await
    }

    pub(super) fn returned(
        tx: Transaction,
        reason: ReturnReason,
    ) -> Result<SubmissionOutcome, EngineError> {
        log::info!(
            "Returning transaction with {} operations ({:?})",
            tx.operations.len(),
            reason
        );
        Ok(SubmissionOutcome::Returned {
            envelope: tx.to_envelope()?,
            transaction: Box::new(tx),
            reason,
        })
    }

    pub(super) async fn submit(&self, tx: Transaction) -> Result<SubmissionOutcome, EngineError> {
        let hash = tx.hash_hex()?;
        match self.ledger.submit(&TransactionEnvelope::Tx(tx)).await {
            Ok(receipt) => {
                log::info!("Submitted {} in ledger {}", hash, receipt.ledger);
                Ok(SubmissionOutcome::Submitted {
                    hash,
                    ledger: receipt.ledger,
                })
            }
            Err(error) => {
                log::warn!("Submission of {} rejected: {}", hash, error);
                Ok(SubmissionOutcome::Rejected { hash, error })
            }
        }
    }

    /// Publish an event for a confirmed submission
    pub(super) fn publish(
        &self,
        outcome: &SubmissionOutcome,
        event: impl FnOnce(String) -> EngineEvent,
    ) {
        if !self.settings.emit_events {
            return;
        }
        if let SubmissionOutcome::Submitted { hash, .. } = outcome {
            self.events.publish(event(hash.clone()));
        }
    }

    // =========================================================================
    // Account lifecycle
    // =========================================================================

    /// Starting balance: configured value, else base plus one reserve per
    /// requested trustline
    pub fn starting_balance(&self) -> Result<String, EngineError> {
        match &self.settings.starting_balance {
            Some(balance) => Ok(Self::positive_amount(balance)?.0),
            None => {
                let trustlines = self.settings.base_trustlines.len() as f64;
                Ok(format_f64(
                    BASE_STARTING_BALANCE + TRUSTLINE_RESERVE * trustlines,
                )?)
            }
        }
    }

    /// Operations creating `new_account`, optionally inside a sponsorship
    /// bracket paid by `sponsor`
    pub fn account_creation_ops(
        &self,
        new_account: &str,
        sponsor: Option<&str>,
    ) -> Result<Vec<Operation>, EngineError> {
        let mut ops = Vec::new();
        if let Some(sponsor) = sponsor {
            ops.push(Operation::begin_sponsoring(new_account).with_source(sponsor));
        }
        ops.push(Operation::create_account(
            new_account,
            &self.starting_balance()?,
        ));
        if let Some(domain) = &self.settings.home_domain {
            ops.push(
                Operation::set_options(SetOptions {
                    home_domain: Some(domain.clone()),
                    ..Default::default()
                })
                .with_source(new_account),
            );
        }
        for asset in &self.settings.base_trustlines {
            ops.push(Operation::change_trust(asset.clone()).with_source(new_account));
        }
        if sponsor.is_some() {
            ops.push(Operation::end_sponsoring().with_source(new_account));
        }
        Ok(ops)
    }

    /// Create and fund a new account from `funder_secret`, or from the
    /// account creator role when no secret is given
    pub async fn create_account(
        &self,
        funder_secret: Option<&str>,
    ) -> Result<CreatedAccount, EngineError> {
        let (funder_id, funder_key) = match funder_secret {
            Some(secret) => {
                let key = Self::keypair_from_secret(secret)?;
                (key.account_id(), Some(key))
            }
            None => {
                let creator = self.configured_role(
                    self.settings.account_creator.as_ref(),
                    "account.config.create_by",
                )?;
                (creator.public_key().to_string(), None)
            }
        };
        let sponsor = match &self.settings.account_sponsor {
            Some(role) => Some(self.directory.require(role)?.public_key().to_string()),
            None => None,
        };

        let new_account = KeyPair::generate();
        log::info!("Creating account {}", new_account.account_id());

        let fee = self.fee(FeeLevel::Base).await;
        let funder = self.load(&funder_id).await?;
        let ops = self.account_creation_ops(&new_account.account_id(), sponsor.as_deref())?;
        let tx = self
            .builder(&funder, fee)
            .add_operations(ops)
            .set_timeout(self.settings.admin_timeout)
            .build()?;

        let mut extra: Vec<KeyPair> = funder_key.into_iter().collect();
        extra.push(new_account.clone());
        let outcome = self.finalize(tx, &extra, false).await?;

        let account_id = new_account.account_id();
        self.publish(&outcome, |hash| EngineEvent::AccountCreated { account_id, hash });
        Ok(CreatedAccount {
            keypair: new_account,
            outcome,
        })
    }

    /// Return every non-native balance to the account creator, drop the
    /// trustlines and merge the account into it
    pub async fn delete_account(&self, secret: &str) -> Result<SubmissionOutcome, EngineError> {
        let destination = self
            .configured_role(
                self.settings.account_creator.as_ref(),
                "account.config.create_by",
            )?
            .public_key()
            .to_string();
        let key = Self::keypair_from_secret(secret)?;

        let fee = self.fee(FeeLevel::Base).await;
        let state = self.load(&key.account_id()).await?;

        let mut builder = self.builder(&state, fee);
        for line in state.trustlines() {
            if line.amount() != 0.0 {
                builder = builder.add_operation(Operation::payment(
                    &destination,
                    line.asset.clone(),
                    &line.balance,
                ));
            }
            builder = builder.add_operation(Operation::remove_trust(line.asset.clone()));
        }
        let tx = builder
            .add_operation(Operation::account_merge(&destination))
            .set_timeout(self.settings.payment_timeout)
            .build()?;
        log::info!(
            "Merging {} into {} ({} operations)",
            key.account_id(),
            destination,
            tx.operations.len()
        );

        let outcome = self.finalize(tx, &[key.clone()], false).await?;
        let account_id = key.account_id();
        self.publish(&outcome, |hash| EngineEvent::AccountMerged {
            account_id,
            destination,
            hash,
        });
        Ok(outcome)
    }

    /// Random key pair, funded by the faucet on the test network
    pub async fn create_demo_account(&self) -> Result<KeyPair, EngineError> {
        let key = KeyPair::generate();
        if self.settings.network.has_faucet() {
            log::info!("Funding {} with the faucet", key.account_id());
            self.ledger.fund_via_faucet(&key.account_id()).await?;
        } else {
            log::warn!("No faucet on {}, {} left unfunded", self.settings.network, key.account_id());
        }
        Ok(key)
    }

    /// Build (never submit) a transaction adding signers and setting
    /// options on `account_id`; returns the unsigned envelope
    pub async fn add_signers(
        &self,
        account_id: &str,
        signers: &[crate::core::SignerUpdate],
        options: SetOptions,
    ) -> Result<String, EngineError> {
        Self::check_account_id(account_id)?;
        for signer in signers {
            Self::check_account_id(&signer.key)?;
        }
        let state = self.load(account_id).await?;

        let mut builder = self.builder(&state, self.settings.base_fee);
        for signer in signers {
            builder = builder.add_operation(Operation::set_options(SetOptions {
                signer: Some(signer.clone()),
                ..Default::default()
            }));
        }
        if options != SetOptions::default() {
            builder = builder.add_operation(Operation::set_options(options));
        }
        let tx = builder.set_timeout(self.settings.admin_timeout).build()?;
        Ok(tx.to_envelope()?)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_valid_account(account_id: &str) -> bool {
        is_valid_account_id(account_id)
    }

    pub async fn account_balances(&self, account_id: &str) -> Result<Vec<Balance>, EngineError> {
        Self::check_account_id(account_id)?;
        Ok(self.load(account_id).await?.balances)
    }

    /// Balance line for `XLM` or `CODE:ISSUER`, if held
    pub async fn asset_balance(
        &self,
        account_id: &str,
        asset: &str,
    ) -> Result<Option<Balance>, EngineError> {
        let asset = Self::resolve_asset(asset)?;
        let balances = self.account_balances(account_id).await?;
        Ok(balances.into_iter().find(|b| b.asset == asset))
    }

    /// Round a float amount to the ledger's precision
    pub fn normalize_amount(value: f64) -> Result<String, EngineError> {
        Ok(format_amount(amount_from_f64(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Network, OperationBody};
    use crate::engine::testing::World;
    use crate::ledger::stub::StubLedger;

    #[tokio::test]
    async fn test_unknown_configured_role_fails_before_network() {
        let settings = AssemblerSettings {
            issuer: Some("ghost".to_string()),
            ..Default::default()
        };
        let result = TransactionAssembler::new(
            settings,
            Arc::new(AccountDirectory::default()),
            Arc::new(StubLedger::default()),
        );
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_starting_balance_covers_trustlines() {
        let world = World::new().await;
        let mut settings = world.settings();
        settings.base_trustlines = vec![world.gold(), world.silver()];
        let assembler = world.assembler_with(settings);
        assert_eq!(assembler.starting_balance().unwrap(), "2");

        let mut settings = world.settings();
        settings.starting_balance = Some("5.25".to_string());
        let assembler = world.assembler_with(settings);
        assert_eq!(assembler.starting_balance().unwrap(), "5.25");
    }

    #[tokio::test]
    async fn test_sponsored_creation_bracket_order() {
        let world = World::new().await;
        let mut settings = world.settings();
        settings.home_domain = Some("example.org".to_string());
        settings.base_trustlines = vec![world.gold()];
        let assembler = world.assembler_with(settings);

        let new_id = KeyPair::generate().account_id();
        let ops = assembler
            .account_creation_ops(&new_id, Some("sponsor-id"))
            .unwrap();
        let kinds: Vec<_> = ops.iter().map(|o| o.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "begin_sponsoring",
                "create_account",
                "set_options",
                "change_trust",
                "end_sponsoring"
            ]
        );
        assert_eq!(ops[0].source.as_deref(), Some("sponsor-id"));
        assert_eq!(ops[1].source, None);
        assert!(ops[2..].iter().all(|o| o.source.as_deref() == Some(new_id.as_str())));
        assert_eq!(
            ops[1].body,
            OperationBody::CreateAccount {
                destination: new_id.clone(),
                starting_balance: "1.5".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_create_account_on_ledger() {
        let world = World::new().await;
        let mut settings = world.settings();
        settings.base_trustlines = vec![world.gold()];
        settings.home_domain = Some("example.org".to_string());
        settings.emit_events = true;
        let assembler = world.assembler_with(settings);
        let mut events = assembler.events().subscribe();

        let created = assembler.create_account(None).await.unwrap();
        assert!(created.outcome.is_submitted(), "{:?}", created.outcome);

        let state = world
            .ledger
            .load_account(&created.keypair.account_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.native_balance(), 1.5);
        assert!(state.balance_for(&world.gold()).is_some());
        assert_eq!(state.home_domain.as_deref(), Some("example.org"));

        let event = events.recv().await.unwrap();
        assert!(matches!(event, EngineEvent::AccountCreated { account_id, .. }
            if account_id == created.keypair.account_id()));
    }

    #[tokio::test]
    async fn test_create_account_with_sponsor_and_funder_secret() {
        let world = World::new().await;
        let mut settings = world.settings();
        settings.account_sponsor = Some("sponsor".to_string());
        settings.base_trustlines = vec![world.gold()];
        let assembler = world.assembler_with(settings);

        let funder = world.funded("50").await;
        let created = assembler
            .create_account(Some(&funder.secret()))
            .await
            .unwrap();
        assert!(created.outcome.is_submitted(), "{:?}", created.outcome);
    }

    #[tokio::test]
    async fn test_create_account_rejects_bad_secret() {
        let world = World::new().await;
        let assembler = world.assembler();
        assert!(matches!(
            assembler.create_account(Some("not-a-secret")).await,
            Err(EngineError::InvalidSecret)
        ));
    }

    #[tokio::test]
    async fn test_delete_account_returns_balances_and_merges() {
        let world = World::new().await;
        let assembler = world.assembler();
        let holder = world.funded("20").await;
        world.trust_and_pay(&world.creator, &world.gold(), "0").await;
        world.trust_and_pay(&holder, &world.gold(), "3").await;
        world.trust_and_pay(&holder, &world.silver(), "0").await;

        let state = world.ledger.load_account(&holder.account_id()).await.unwrap().unwrap();
        let fee = assembler.fee(FeeLevel::Base).await;
        assert_eq!(fee, BASE_FEE);
        assert_eq!(state.trustlines().count(), 2);

        let outcome = assembler.delete_account(&holder.secret()).await.unwrap();
        assert!(outcome.is_submitted(), "{:?}", outcome);
        assert!(world
            .ledger
            .load_account(&holder.account_id())
            .await
            .unwrap()
            .is_none());
        let creator = world
            .ledger
            .load_account(&world.creator.account_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(creator.balance_of(&world.gold()), 3.0);
    }

    #[tokio::test]
    async fn test_add_signers_returns_unsigned_envelope() {
        let world = World::new().await;
        let assembler = world.assembler();
        let signer = KeyPair::generate();
        let before = world.ledger.applied_count().await;

        let envelope = assembler
            .add_signers(
                &world.creator.account_id(),
                &[crate::core::SignerUpdate {
                    key: signer.account_id(),
                    weight: 1,
                }],
                SetOptions {
                    master_weight: Some(1),
                    low_threshold: Some(1),
                    med_threshold: Some(2),
                    high_threshold: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let TransactionEnvelope::Tx(tx) = TransactionEnvelope::decode(&envelope).unwrap() else {
            panic!("expected plain transaction");
        };
        assert_eq!(tx.operations.len(), 2);
        assert!(tx.signatures.is_empty());
        assert!(tx.time_bounds.max_time > 0);
        assert_eq!(world.ledger.applied_count().await, before);
    }

    #[tokio::test]
    async fn test_demo_account_and_queries() {
        let world = World::new().await;
        let assembler = world.assembler();
        let demo = assembler.create_demo_account().await.unwrap();

        assert!(TransactionAssembler::is_valid_account(&demo.account_id()));
        assert!(!TransactionAssembler::is_valid_account("GBAD"));
        let balances = assembler.account_balances(&demo.account_id()).await.unwrap();
        assert_eq!(balances.len(), 1);
        let native = assembler
            .asset_balance(&demo.account_id(), "XLM")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(native.balance, "10000");
        assert!(assembler
            .asset_balance(&demo.account_id(), &world.gold().to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_demo_account_on_public_network_is_unfunded() {
        let stub = Arc::new(StubLedger::default());
        let settings = AssemblerSettings {
            network: Network::Public,
            ..Default::default()
        };
        let assembler =
            TransactionAssembler::new(settings, Arc::new(AccountDirectory::default()), stub.clone())
                .unwrap();
        assembler.create_demo_account().await.unwrap();
        assert!(stub.funded.lock().unwrap().is_empty());
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(TransactionAssembler::normalize_amount(1.23456789).unwrap(), "1.2345679");
        assert!(TransactionAssembler::normalize_amount(-1.0).is_err());
    }
}
