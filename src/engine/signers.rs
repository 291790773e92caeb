//! Signer resolution
//!
//! Works out which held keys must sign a transaction and whether together
//! they reach each touched account's threshold for the operations it
//! sources. Weights come from the ledger, never from configuration.

use crate::core::{LedgerAccountState, ThresholdCategory, Transaction};
use crate::crypto::KeyPair;
use crate::directory::AccountDirectory;
use crate::engine::error::EngineError;
use crate::ledger::LedgerClient;
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered, deduplicated signing keys
#[derive(Debug, Clone, Default)]
pub struct SignerSet {
    keys: Vec<KeyPair>,
}

impl SignerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key unless an equal one is already present
    pub fn insert(&mut self, key_pair: &KeyPair) -> bool {
        if self.contains(&key_pair.account_id()) {
            return false;
        }
        self.keys.push(key_pair.clone());
        true
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.keys.iter().any(|k| k.account_id() == account_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPair> {
        self.keys.iter()
    }

    pub fn account_ids(&self) -> Vec<String> {
        self.keys.iter().map(KeyPair::account_id).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Weight check for one operation against its source account
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdCheck {
    pub operation: usize,
    pub account_id: String,
    pub category: ThresholdCategory,
    pub required: u8,
    /// Combined ledger weight of held keys; `None` if the account is missing
    pub weight: Option<u32>,
}

impl ThresholdCheck {
    pub fn is_met(&self) -> bool {
        self.weight.map_or(false, |w| w >= self.required as u32)
    }
}

/// Signers for a transaction plus whether they are sufficient
#[derive(Debug, Clone, Default)]
pub struct SignerResolution {
    pub signers: SignerSet,
    pub valid_to_sign: bool,
    pub checks: Vec<ThresholdCheck>,
}

pub struct SignerResolver {
    directory: Arc<AccountDirectory>,
    ledger: Arc<dyn LedgerClient>,
}

impl SignerResolver {
    pub fn new(directory: Arc<AccountDirectory>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { directory, ledger }
    }

    /// Compute the signer set for a transaction.
    ///
    /// Every operation whose source is a tracked account contributes that
    /// account's own key and all of its co-signers whose secrets are held;
    /// keys held elsewhere add no weight. Insufficient
    /// weight clears `valid_to_sign` but never stops the scan. `extra` keys
    /// are added only when they source the transaction or an operation.
    pub async fn resolve(
        &self,
        tx: &Transaction,
        extra: &[KeyPair],
    ) -> Result<SignerResolution, EngineError> {
        let mut signers = SignerSet::new();
        let mut checks = Vec::new();
        let mut valid = true;
        // Account states are loaded once per resolution
        let mut states: HashMap<String, Option<LedgerAccountState>> = HashMap::new();

        for (index, op) in tx.operations.iter().enumerate() {
            let source = op.effective_source(&tx.source);
            let Some(account) = self.directory.find_by_public_key(source) else {
                continue;
            };

            let mut candidates: Vec<&KeyPair> = Vec::new();
            if let Some(own) = account.keypair() {
                candidates.push(own);
            }
            for co_signer in self.directory.co_signers(account) {
                // Keyless co-signers sign outside this system
                let Some(key) = co_signer.keypair() else {
                    log::debug!(
                        "Co-signer {} of {} signs externally",
                        co_signer.role(),
                        account.role()
                    );
                    continue;
                };
                if !candidates.iter().any(|c| *c == key) {
                    candidates.push(key);
                }
            }
            for key in &candidates {
                signers.insert(key);
            }

            if !states.contains_key(source) {
                let state = self.ledger.load_account(source).await?;
                states.insert(source.to_string(), state);
            }
            let category = op.threshold_category();
            let check = match states.get(source).and_then(Option::as_ref) {
                Some(state) => {
                    let weight = candidates
                        .iter()
                        .map(|k| state.signer_weight(&k.account_id()) as u32)
                        .sum();
                    ThresholdCheck {
                        operation: index,
                        account_id: source.to_string(),
                        category,
                        required: state.thresholds.for_category(category),
                        weight: Some(weight),
                    }
                }
                None => ThresholdCheck {
                    operation: index,
                    account_id: source.to_string(),
                    category,
                    required: 0,
                    weight: None,
                },
            };

            if !check.is_met() {
                log::warn!(
                    "Role {} cannot meet {} threshold for {} (weight {:?}, need {})",
                    account.role(),
                    category,
                    op.kind(),
                    check.weight,
                    check.required
                );
                valid = false;
            }
            checks.push(check);
        }

        for key in extra {
            let id = key.account_id();
            if signers.contains(&id) {
                continue;
            }
            if tx.source == id || tx.operation_sources().any(|s| s == id) {
                signers.insert(key);
            }
        }

        log::debug!(
            "Resolved {} signers, valid to sign: {}",
            signers.len(),
            valid
        );

        Ok(SignerResolution {
            signers,
            valid_to_sign: valid,
            checks,
        })
    }

    /// Resolve and apply the signatures; returns whether they suffice
    pub async fn sign(&self, tx: &mut Transaction, extra: &[KeyPair]) -> Result<bool, EngineError> {
        let resolution = self.resolve(tx, extra).await?;
        for key in resolution.signers.iter() {
            tx.sign(key)?;
        }
        Ok(resolution.valid_to_sign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AccountSigner, Asset, Balance, LedgerAccountState, Network, Operation, Thresholds,
        TransactionBuilder,
    };
    use crate::directory::AccountDefinition;
    use crate::ledger::stub::StubLedger;

    fn state(id: &str, thresholds: Thresholds, signers: &[(&str, u8)]) -> LedgerAccountState {
        LedgerAccountState {
            account_id: id.to_string(),
            sequence: 100,
            balances: vec![Balance {
                asset: Asset::Native,
                balance: "50".to_string(),
                limit: None,
                authorized: true,
            }],
            thresholds,
            signers: signers
                .iter()
                .map(|(key, weight)| AccountSigner {
                    key: key.to_string(),
                    weight: *weight,
                })
                .collect(),
            flags: Default::default(),
            home_domain: None,
        }
    }

    fn tx(source: &str, ops: Vec<Operation>) -> Transaction {
        TransactionBuilder::new(Network::Testnet, source, 100, 100)
            .add_operations(ops)
            .build()
            .unwrap()
    }

    struct Fixture {
        treasury: KeyPair,
        admin: KeyPair,
        auditor: KeyPair,
        directory: Arc<AccountDirectory>,
    }

    /// treasury is co-signed by admin and auditor; treasury's own secret
    /// is not held
    fn fixture() -> Fixture {
        let treasury = KeyPair::generate();
        let admin = KeyPair::generate();
        let auditor = KeyPair::generate();
        let directory = AccountDirectory::new(vec![
            AccountDefinition::new("treasury")
                .with_public_key(&treasury.account_id())
                .with_co_signer("admin")
                .with_co_signer("auditor"),
            AccountDefinition::new("admin").with_secret(&admin.secret()),
            AccountDefinition::new("auditor").with_secret(&auditor.secret()),
        ])
        .unwrap();
        Fixture {
            treasury,
            admin,
            auditor,
            directory: Arc::new(directory),
        }
    }

    #[tokio::test]
    async fn test_combined_weight_meets_threshold() {
        let f = fixture();
        let ledger = StubLedger::with_accounts(vec![state(
            &f.treasury.account_id(),
            Thresholds::new(1, 2, 3),
            &[
                (&f.treasury.account_id(), 0),
                (&f.admin.account_id(), 1),
                (&f.auditor.account_id(), 1),
            ],
        )]);
        let resolver = SignerResolver::new(f.directory.clone(), Arc::new(ledger));
        let t = tx(
            &f.treasury.account_id(),
            vec![Operation::payment(&f.admin.account_id(), Asset::Native, "1")],
        );

        let res = resolver.resolve(&t, &[]).await.unwrap();
        assert!(res.valid_to_sign);
        assert_eq!(
            res.signers.account_ids(),
            vec![f.admin.account_id(), f.auditor.account_id()]
        );
        assert_eq!(res.checks[0].weight, Some(2));
    }

    #[tokio::test]
    async fn test_insufficient_weight_is_not_an_error() {
        let f = fixture();
        let ledger = StubLedger::with_accounts(vec![state(
            &f.treasury.account_id(),
            Thresholds::new(1, 2, 3),
            &[(&f.admin.account_id(), 1), (&f.auditor.account_id(), 1)],
        )]);
        let resolver = SignerResolver::new(f.directory.clone(), Arc::new(ledger));
        let t = tx(
            &f.treasury.account_id(),
            vec![
                Operation::account_merge(&f.admin.account_id()),
                Operation::payment(&f.admin.account_id(), Asset::Native, "1"),
            ],
        );

        let res = resolver.resolve(&t, &[]).await.unwrap();
        assert!(!res.valid_to_sign);
        // scan continued past the failing merge
        assert_eq!(res.checks.len(), 2);
        assert!(!res.checks[0].is_met());
        assert!(res.checks[1].is_met());
        assert_eq!(res.signers.len(), 2);
    }

    #[tokio::test]
    async fn test_threshold_follows_operation_category() {
        let f = fixture();
        let ledger = StubLedger::with_accounts(vec![state(
            &f.treasury.account_id(),
            Thresholds::new(1, 2, 2),
            &[(&f.admin.account_id(), 1)],
        )]);
        let directory = Arc::new(
            AccountDirectory::new(vec![
                AccountDefinition::new("treasury")
                    .with_public_key(&f.treasury.account_id())
                    .with_co_signer("admin"),
                AccountDefinition::new("admin").with_secret(&f.admin.secret()),
            ])
            .unwrap(),
        );
        let resolver = SignerResolver::new(directory, Arc::new(ledger));

        let low_only = tx(
            &f.treasury.account_id(),
            vec![Operation::allow_trust(&f.auditor.account_id(), "GOLD", true)],
        );
        let res = resolver.resolve(&low_only, &[]).await.unwrap();
        assert!(res.valid_to_sign);
        assert_eq!(res.checks[0].category, ThresholdCategory::Low);
        assert_eq!(res.checks[0].required, 1);

        let medium = tx(
            &f.treasury.account_id(),
            vec![Operation::payment(&f.auditor.account_id(), Asset::Native, "1")],
        );
        assert!(!resolver.resolve(&medium, &[]).await.unwrap().valid_to_sign);
    }

    #[tokio::test]
    async fn test_missing_ledger_account_marks_invalid() {
        let f = fixture();
        let resolver = SignerResolver::new(f.directory.clone(), Arc::new(StubLedger::default()));
        let t = tx(
            &f.treasury.account_id(),
            vec![Operation::payment(&f.admin.account_id(), Asset::Native, "1")],
        );
        let res = resolver.resolve(&t, &[]).await.unwrap();
        assert!(!res.valid_to_sign);
        assert_eq!(res.checks[0].weight, None);
    }

    #[tokio::test]
    async fn test_extra_keys_only_when_referenced() {
        let f = fixture();
        let sender = KeyPair::generate();
        let recipient = KeyPair::generate();
        let bystander = KeyPair::generate();
        let resolver = SignerResolver::new(f.directory.clone(), Arc::new(StubLedger::default()));

        let t = tx(
            &sender.account_id(),
            vec![
                Operation::change_trust(Asset::credit("GOLD", &f.admin.account_id()).unwrap())
                    .with_source(recipient.account_id()),
                Operation::payment(&recipient.account_id(), Asset::Native, "1"),
            ],
        );
        let res = resolver
            .resolve(&t, &[sender.clone(), recipient.clone(), bystander, sender.clone()])
            .await
            .unwrap();

        assert!(res.valid_to_sign);
        assert_eq!(
            res.signers.account_ids(),
            vec![sender.account_id(), recipient.account_id()]
        );
    }

    #[tokio::test]
    async fn test_external_co_signer_leaves_transaction_incomplete() {
        let f = fixture();
        let hardware = KeyPair::generate();
        let directory = AccountDirectory::new(vec![
            AccountDefinition::new("treasury")
                .with_public_key(&f.treasury.account_id())
                .with_co_signer("admin")
                .with_co_signer("hardware"),
            AccountDefinition::new("admin").with_secret(&f.admin.secret()),
            AccountDefinition::new("hardware").with_public_key(&hardware.account_id()),
        ])
        .unwrap();
        let ledger = StubLedger::with_accounts(vec![state(
            &f.treasury.account_id(),
            Thresholds::new(1, 2, 2),
            &[
                (&f.treasury.account_id(), 0),
                (&f.admin.account_id(), 1),
                (&hardware.account_id(), 1),
            ],
        )]);
        let resolver = SignerResolver::new(Arc::new(directory), Arc::new(ledger));
        let t = tx(
            &f.treasury.account_id(),
            vec![Operation::payment(&f.admin.account_id(), Asset::Native, "1")],
        );

        let res = resolver.resolve(&t, &[]).await.unwrap();
        assert!(!res.valid_to_sign);
        assert_eq!(res.signers.account_ids(), vec![f.admin.account_id()]);
        assert_eq!(res.checks[0].weight, Some(1));
        assert_eq!(res.checks[0].required, 2);
    }

    #[tokio::test]
    async fn test_sign_applies_signatures() {
        let f = fixture();
        let ledger = StubLedger::with_accounts(vec![state(
            &f.treasury.account_id(),
            Thresholds::new(0, 0, 0),
            &[(&f.admin.account_id(), 1), (&f.auditor.account_id(), 1)],
        )]);
        let resolver = SignerResolver::new(f.directory.clone(), Arc::new(ledger));
        let mut t = tx(
            &f.treasury.account_id(),
            vec![Operation::payment(&f.admin.account_id(), Asset::Native, "1")],
        );
        assert!(resolver.sign(&mut t, &[]).await.unwrap());
        assert!(t.is_signed_by(&f.admin.account_id()));
        assert!(t.is_signed_by(&f.auditor.account_id()));
        assert!(!t.is_signed_by(&f.treasury.account_id()));
    }
}
