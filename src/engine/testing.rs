//! Shared fixtures for engine tests

use crate::core::{
    parse_amount, Asset, Balance, LedgerAccountState, Network, Operation, Thresholds,
    TransactionBuilder, TransactionEnvelope, BASE_FEE,
};
use crate::crypto::KeyPair;
use crate::directory::{AccountDefinition, AccountDirectory};
use crate::engine::assembler::{AssemblerSettings, TransactionAssembler};
use crate::ledger::stub::StubLedger;
use crate::ledger::{LedgerClient, MemoryLedger};
use std::sync::Arc;

/// Starting native balance of every role account
pub const ROLE_FUNDING: &str = "1000";

/// A sandbox ledger with funded `creator`, `sponsor`, `issuer` and
/// `distributor` roles whose secrets are all held
pub struct World {
    pub ledger: Arc<MemoryLedger>,
    pub directory: Arc<AccountDirectory>,
    pub creator: KeyPair,
    pub sponsor: KeyPair,
    pub issuer: KeyPair,
    pub distributor: KeyPair,
}

impl World {
    pub async fn new() -> Self {
        let ledger = Arc::new(MemoryLedger::new(Network::Testnet));
        let creator = KeyPair::generate();
        let sponsor = KeyPair::generate();
        let issuer = KeyPair::generate();
        let distributor = KeyPair::generate();

        let mut definitions = Vec::new();
        for (role, key) in [
            ("creator", &creator),
            ("sponsor", &sponsor),
            ("issuer", &issuer),
            ("distributor", &distributor),
        ] {
            ledger
                .fund_account(&key.account_id(), ROLE_FUNDING)
                .await
                .unwrap();
            definitions.push(AccountDefinition::new(role).with_secret(&key.secret()));
        }

        Self {
            ledger,
            directory: Arc::new(AccountDirectory::new(definitions).unwrap()),
            creator,
            sponsor,
            issuer,
            distributor,
        }
    }

    pub fn settings(&self) -> AssemblerSettings {
        AssemblerSettings {
            account_creator: Some("creator".to_string()),
            issuer: Some("issuer".to_string()),
            distributor: Some("distributor".to_string()),
            ..Default::default()
        }
    }

    pub fn assembler(&self) -> TransactionAssembler {
        self.assembler_with(self.settings())
    }

    pub fn assembler_with(&self, settings: AssemblerSettings) -> TransactionAssembler {
        TransactionAssembler::new(settings, self.directory.clone(), self.ledger.clone()).unwrap()
    }

    /// Same roles, but against a scripted ledger
    pub fn assembler_on(&self, ledger: Arc<StubLedger>) -> TransactionAssembler {
        self.assembler_on_with(ledger, self.settings())
    }

    pub fn assembler_on_with(
        &self,
        ledger: Arc<StubLedger>,
        settings: AssemblerSettings,
    ) -> TransactionAssembler {
        TransactionAssembler::new(settings, self.directory.clone(), ledger).unwrap()
    }

    /// No roles, default settings, scripted ledger
    pub fn stub_assembler(ledger: Arc<StubLedger>) -> TransactionAssembler {
        TransactionAssembler::new(
            AssemblerSettings::default(),
            Arc::new(AccountDirectory::default()),
            ledger,
        )
        .unwrap()
    }

    pub fn gold(&self) -> Asset {
        Asset::credit("GOLD", &self.issuer.account_id()).unwrap()
    }

    pub fn silver(&self) -> Asset {
        Asset::credit("SILVER", &self.issuer.account_id()).unwrap()
    }

    /// A fresh account holding `amount` native units
    pub async fn funded(&self, amount: &str) -> KeyPair {
        let key = KeyPair::generate();
        self.ledger
            .fund_account(&key.account_id(), amount)
            .await
            .unwrap();
        key
    }

    /// Open `holder`'s trustline to an asset of the world issuer and have
    /// the issuer pay it `amount` (skipped when zero)
    pub async fn trust_and_pay(&self, holder: &KeyPair, asset: &Asset, amount: &str) {
        let state = self
            .ledger
            .load_account(&holder.account_id())
            .await
            .unwrap()
            .unwrap();
        let mut builder =
            TransactionBuilder::new(Network::Testnet, &holder.account_id(), state.sequence, BASE_FEE)
                .add_operation(Operation::change_trust(asset.clone()));
        let pays = parse_amount(amount).unwrap() > 0;
        if pays {
            builder = builder.add_operation(
                Operation::payment(&holder.account_id(), asset.clone(), amount)
                    .with_source(self.issuer.account_id()),
            );
        }

        let mut tx = builder.build().unwrap();
        tx.sign(holder).unwrap();
        if pays {
            tx.sign(&self.issuer).unwrap();
        }
        self.ledger
            .submit(&TransactionEnvelope::Tx(tx))
            .await
            .unwrap();
    }
}

/// Ledger snapshot for a scripted account
pub fn stub_state(account_id: &str, native: &str, lines: &[(&Asset, &str)]) -> LedgerAccountState {
    let mut balances = vec![Balance {
        asset: Asset::Native,
        balance: native.to_string(),
        limit: None,
        authorized: true,
    }];
    balances.extend(lines.iter().map(|(asset, amount)| Balance {
        asset: (*asset).clone(),
        balance: amount.to_string(),
        limit: Some("1000000".to_string()),
        authorized: true,
    }));

    LedgerAccountState {
        account_id: account_id.to_string(),
        sequence: 4096,
        balances,
        thresholds: Thresholds::default(),
        signers: vec![crate::core::AccountSigner {
            key: account_id.to_string(),
            weight: 1,
        }],
        flags: Default::default(),
        home_domain: None,
    }
}
