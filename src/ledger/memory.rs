//! In-process sandbox ledger
//!
//! `MemoryLedger` keeps accounts, trustlines and signers in memory and
//! applies submitted transactions with the same checks a real ledger would
//! make: sequence, time bounds, fee, signatures, per-operation threshold
//! weights and reserves. A transaction is applied to a working copy and only
//! committed if every operation succeeds.

use crate::core::{
    format_amount, parse_amount, AccountFlags, AccountSigner, Asset, Balance, FeeBumpTransaction,
    FeeStats, LedgerAccountState, Network, Operation, OperationBody, SetOptions, Thresholds,
    Transaction, TransactionEnvelope, BASE_FEE, STROOPS_PER_UNIT,
};
use crate::crypto::is_valid_account_id;
use crate::ledger::client::{AccountsPage, LedgerClient, LedgerError, SubmitReceipt};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

// =============================================================================
// Constants
// =============================================================================

/// Reserve held per ledger entry (stroops)
pub const BASE_RESERVE: i64 = STROOPS_PER_UNIT / 2;

/// Amount the test network faucet pays out (stroops)
pub const FAUCET_AMOUNT: i64 = 10_000 * STROOPS_PER_UNIT;

/// Maximum additional signers per account
pub const MAX_SIGNERS: usize = 20;

type OpResult = Result<(), &'static str>;

// =============================================================================
// Ledger Entries
// =============================================================================

#[derive(Debug, Clone)]
struct Trustline {
    balance: i64,
    limit: i64,
    authorized: bool,
    sponsor: Option<String>,
}

#[derive(Debug, Clone)]
struct AccountRecord {
    sequence: i64,
    native: i64,
    trustlines: BTreeMap<Asset, Trustline>,
    master_weight: u8,
    thresholds: Thresholds,
    signers: Vec<AccountSigner>,
    flags: AccountFlags,
    home_domain: Option<String>,
    /// Account paying this account's base reserve
    sponsor: Option<String>,
    /// Entries of other accounts this account pays reserves for
    num_sponsoring: u32,
}

impl AccountRecord {
    fn new(sequence: i64, native: i64) -> Self {
        Self {
            sequence,
            native,
            trustlines: BTreeMap::new(),
            master_weight: 1,
            thresholds: Thresholds::default(),
            signers: Vec::new(),
            flags: AccountFlags::empty(),
            home_domain: None,
            sponsor: None,
            num_sponsoring: 0,
        }
    }

    fn num_sponsored(&self) -> u32 {
        let base = if self.sponsor.is_some() { 2 } else { 0 };
        base + self
            .trustlines
            .values()
            .filter(|t| t.sponsor.is_some())
            .count() as u32
    }

    fn min_balance(&self) -> i64 {
        let entries = 2 + self.trustlines.len() as i64 + self.signers.len() as i64
            + self.num_sponsoring as i64
            - self.num_sponsored() as i64;
        entries.max(0) * BASE_RESERVE
    }

    /// Combined weight of the given keys on this account
    fn weight_of(&self, account_id: &str, keys: &BTreeSet<String>) -> u32 {
        let master = if keys.contains(account_id) {
            self.master_weight as u32
        } else {
            0
        };
        master
            + self
                .signers
                .iter()
                .filter(|s| keys.contains(&s.key))
                .map(|s| s.weight as u32)
                .sum::<u32>()
    }

    fn to_state(&self, account_id: &str) -> LedgerAccountState {
        let mut balances = vec![Balance {
            asset: Asset::Native,
            balance: format_amount(self.native),
            limit: None,
            authorized: true,
        }];
        balances.extend(self.trustlines.iter().map(|(asset, line)| Balance {
            asset: asset.clone(),
            balance: format_amount(line.balance),
            limit: Some(format_amount(line.limit)),
            authorized: line.authorized,
        }));

        let mut signers = vec![AccountSigner {
            key: account_id.to_string(),
            weight: self.master_weight,
        }];
        signers.extend(self.signers.iter().cloned());

        LedgerAccountState {
            account_id: account_id.to_string(),
            sequence: self.sequence,
            balances,
            thresholds: self.thresholds,
            signers,
            flags: self.flags,
            home_domain: self.home_domain.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: BTreeMap<String, AccountRecord>,
    ledger: u32,
    fee_stats: Option<FeeStats>,
    applied: usize,
}

/// Scratch state for one transaction
struct Apply<'a> {
    accounts: &'a mut BTreeMap<String, AccountRecord>,
    /// sponsored account id → sponsor id
    sponsorships: HashMap<String, String>,
    signed_by: BTreeSet<String>,
    touched: BTreeSet<String>,
    ledger: u32,
}

// =============================================================================
// MemoryLedger
// =============================================================================

/// Sandbox ledger implementing `LedgerClient`
#[derive(Debug)]
pub struct MemoryLedger {
    network: Network,
    min_fee: u32,
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            min_fee: BASE_FEE,
            state: RwLock::new(LedgerState {
                ledger: 1,
                fee_stats: Some(FeeStats::default()),
                ..Default::default()
            }),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Replace the reported fee stats; `None` makes the stats endpoint fail
    pub async fn set_fee_stats(&self, stats: Option<FeeStats>) {
        self.state.write().await.fee_stats = stats;
    }

    /// Create an account directly with a native balance, on any network
    pub async fn fund_account(&self, account_id: &str, amount: &str) -> Result<(), LedgerError> {
        let native =
            parse_amount(amount).map_err(|e| LedgerError::Malformed(e.to_string()))?;
        self.create_account(account_id, native).await
    }

    /// Number of transactions applied so far
    pub async fn applied_count(&self) -> usize {
        self.state.read().await.applied
    }

    async fn create_account(&self, account_id: &str, native: i64) -> Result<(), LedgerError> {
        if !is_valid_account_id(account_id) {
            return Err(LedgerError::Malformed(format!(
                "invalid account id {}",
                account_id
            )));
        }
        let mut state = self.state.write().await;
        if state.accounts.contains_key(account_id) {
            return Err(LedgerError::Rejected("op_already_exists".to_string()));
        }
        let sequence = (state.ledger as i64) << 32;
        state
            .accounts
            .insert(account_id.to_string(), AccountRecord::new(sequence, native));
        state.ledger += 1;
        log::debug!("Sandbox funded {} with {}", account_id, format_amount(native));
        Ok(())
    }

    fn apply_envelope(
        &self,
        state: &mut LedgerState,
        envelope: &TransactionEnvelope,
    ) -> Result<String, String> {
        let mut accounts = state.accounts.clone();
        let ledger = state.ledger;

        let hash = match envelope {
            TransactionEnvelope::Tx(tx) => {
                self.apply_transaction(&mut accounts, ledger, tx, true)?;
                tx.hash_hex().map_err(|e| e.to_string())?
            }
            TransactionEnvelope::FeeBump(bump) => {
                self.charge_fee_bump(&mut accounts, bump)?;
                self.apply_transaction(&mut accounts, ledger, &bump.inner, false)?;
                bump.hash_hex().map_err(|e| e.to_string())?
            }
        };

        state.accounts = accounts;
        state.ledger += 1;
        state.applied += 1;
        Ok(hash)
    }

    fn charge_fee_bump(
        &self,
        accounts: &mut BTreeMap<String, AccountRecord>,
        bump: &FeeBumpTransaction,
    ) -> Result<(), String> {
        let hash = bump.hash().map_err(|e| e.to_string())?;
        let signed_by = verified_signers(&bump.signatures, &hash)?;

        let payer = accounts
            .get_mut(&bump.fee_source)
            .ok_or("fee_bump_no_source_account")?;
        let weight = payer.weight_of(&bump.fee_source, &signed_by);
        if weight < payer.thresholds.low.max(1) as u32 {
            return Err("fee_bump_bad_auth".to_string());
        }

        let min_fee = self.min_fee as u64 * (bump.inner.operations.len() as u64 + 1);
        if bump.fee < min_fee || bump.fee < bump.inner.fee {
            return Err("fee_bump_insufficient_fee".to_string());
        }
        let fee = i64::try_from(bump.fee).map_err(|_| "fee_bump_insufficient_fee")?;
        if payer.native < fee {
            return Err("fee_bump_insufficient_balance".to_string());
        }
        payer.native -= fee;
        Ok(())
    }

    fn apply_transaction(
        &self,
        accounts: &mut BTreeMap<String, AccountRecord>,
        ledger: u32,
        tx: &Transaction,
        charge_fee: bool,
    ) -> Result<(), String> {
        if tx.network != self.network {
            return Err("tx_bad_network".to_string());
        }
        if tx.operations.is_empty() {
            return Err("tx_missing_operation".to_string());
        }
        let now = Utc::now().timestamp();
        if tx.time_bounds.min_time != 0 && now < tx.time_bounds.min_time {
            return Err("tx_too_early".to_string());
        }
        if tx.time_bounds.max_time != 0 && now > tx.time_bounds.max_time {
            return Err("tx_too_late".to_string());
        }

        let hash = tx.hash().map_err(|e| e.to_string())?;
        let signed_by = verified_signers(&tx.signatures, &hash)?;

        let source = accounts
            .get_mut(&tx.source)
            .ok_or("tx_no_source_account")?;
        if tx.sequence != source.sequence + 1 {
            return Err("tx_bad_seq".to_string());
        }
        if source.weight_of(&tx.source, &signed_by) < source.thresholds.low.max(1) as u32 {
            return Err("tx_bad_auth".to_string());
        }
        if charge_fee {
            let min_fee = self.min_fee as u64 * tx.operations.len() as u64;
            if tx.fee < min_fee {
                return Err("tx_insufficient_fee".to_string());
            }
            let fee = i64::try_from(tx.fee).map_err(|_| "tx_insufficient_fee")?;
            if source.native < fee {
                return Err("tx_insufficient_balance".to_string());
            }
            source.native -= fee;
        }
        source.sequence = tx.sequence;

        let mut apply = Apply {
            accounts,
            sponsorships: HashMap::new(),
            signed_by,
            touched: BTreeSet::new(),
            ledger,
        };
        apply.touched.insert(tx.source.clone());

        for (index, op) in tx.operations.iter().enumerate() {
            apply
                .operation(op.effective_source(&tx.source), op)
                .map_err(|code| format!("op[{}] {}: {}", index, op.kind(), code))?;
        }

        if !apply.sponsorships.is_empty() {
            return Err("tx_bad_sponsorship".to_string());
        }
        for id in &apply.touched {
            if let Some(account) = apply.accounts.get(id) {
                if account.native < account.min_balance() {
                    return Err(format!("op_low_reserve: {}", id));
                }
            }
        }
        Ok(())
    }
}

fn verified_signers(
    signatures: &[crate::core::DecoratedSignature],
    hash: &[u8],
) -> Result<BTreeSet<String>, String> {
    let mut keys = BTreeSet::new();
    for sig in signatures {
        if !sig.verify(hash) {
            return Err("tx_bad_auth".to_string());
        }
        keys.insert(sig.key.clone());
    }
    Ok(keys)
}

fn parse_positive(amount: &str) -> Result<i64, &'static str> {
    match parse_amount(amount) {
        Ok(value) if value > 0 => Ok(value),
        _ => Err("op_malformed"),
    }
}

// =============================================================================
// Operation Application
// =============================================================================

impl Apply<'_> {
    fn account(&mut self, id: &str, missing: &'static str) -> Result<&mut AccountRecord, &'static str> {
        self.touched.insert(id.to_string());
        self.accounts.get_mut(id).ok_or(missing)
    }

    fn operation(&mut self, source: &str, op: &Operation) -> OpResult {
        let account = self.accounts.get(source).ok_or("op_no_source_account")?;
        let required = account
            .thresholds
            .for_category(op.threshold_category())
            .max(1) as u32;
        if account.weight_of(source, &self.signed_by) < required {
            return Err("op_bad_auth");
        }
        self.touched.insert(source.to_string());

        match &op.body {
            OperationBody::CreateAccount {
                destination,
                starting_balance,
            } => self.create_account(source, destination, starting_balance),
            OperationBody::Payment {
                destination,
                asset,
                amount,
            } => self.payment(source, destination, asset, amount),
            OperationBody::ChangeTrust { asset, limit } => {
                self.change_trust(source, asset, limit.as_deref())
            }
            OperationBody::SetOptions(options) => self.set_options(source, options),
            OperationBody::Clawback {
                asset,
                from,
                amount,
            } => self.clawback(source, asset, from, amount),
            OperationBody::AccountMerge { destination } => self.merge(source, destination),
            OperationBody::BeginSponsoring { sponsored_id } => {
                if sponsored_id == source || self.sponsorships.contains_key(sponsored_id) {
                    return Err("op_already_sponsored");
                }
                self.sponsorships
                    .insert(sponsored_id.clone(), source.to_string());
                Ok(())
            }
            OperationBody::EndSponsoring => self
                .sponsorships
                .remove(source)
                .map(|_| ())
                .ok_or("op_not_sponsored"),
            OperationBody::AllowTrust {
                trustor,
                asset_code,
                authorize,
            } => self.allow_trust(source, trustor, asset_code, *authorize),
        }
    }

    fn create_account(&mut self, source: &str, destination: &str, starting: &str) -> OpResult {
        if !is_valid_account_id(destination) {
            return Err("op_malformed");
        }
        if self.accounts.contains_key(destination) {
            return Err("op_already_exists");
        }
        let amount = parse_amount(starting).map_err(|_| "op_malformed")?;

        let funder = self.account(source, "op_no_source_account")?;
        if funder.native < amount {
            return Err("op_underfunded");
        }
        funder.native -= amount;

        let mut record = AccountRecord::new((self.ledger as i64) << 32, amount);
        if let Some(sponsor) = self.sponsorships.get(destination).cloned() {
            self.account(&sponsor, "op_no_sponsor")?.num_sponsoring += 2;
            record.sponsor = Some(sponsor);
        }
        self.accounts.insert(destination.to_string(), record);
        self.touched.insert(destination.to_string());
        Ok(())
    }

    fn payment(&mut self, source: &str, destination: &str, asset: &Asset, amount: &str) -> OpResult {
        let amount = parse_positive(amount)?;
        if !self.accounts.contains_key(destination) {
            return Err("op_no_destination");
        }

        match asset {
            Asset::Native => {
                let from = self.account(source, "op_no_source_account")?;
                if from.native < amount {
                    return Err("op_underfunded");
                }
                from.native -= amount;
                self.account(destination, "op_no_destination")?.native += amount;
            }
            Asset::Credit { issuer, .. } => {
                if source != issuer {
                    let from = self.account(source, "op_no_source_account")?;
                    let line = from.trustlines.get_mut(asset).ok_or("op_src_no_trust")?;
                    if !line.authorized {
                        return Err("op_src_not_authorized");
                    }
                    if line.balance < amount {
                        return Err("op_underfunded");
                    }
                    line.balance -= amount;
                }
                if destination != issuer {
                    let to = self.account(destination, "op_no_destination")?;
                    let line = to.trustlines.get_mut(asset).ok_or("op_no_trust")?;
                    if !line.authorized {
                        return Err("op_not_authorized");
                    }
                    if line.limit - line.balance < amount {
                        return Err("op_line_full");
                    }
                    line.balance += amount;
                }
            }
        }
        Ok(())
    }

    fn change_trust(&mut self, source: &str, asset: &Asset, limit: Option<&str>) -> OpResult {
        let issuer = asset.issuer().ok_or("op_malformed")?;
        if issuer == source {
            return Err("op_malformed");
        }
        let issuer_flags = self.accounts.get(issuer).ok_or("op_no_issuer")?.flags;
        let limit = match limit {
            Some(value) => parse_amount(value).map_err(|_| "op_malformed")?,
            None => i64::MAX,
        };
        let sponsor = self.sponsorships.get(source).cloned();

        let account = self.account(source, "op_no_source_account")?;
        if limit == 0 {
            let line = account.trustlines.get(asset).ok_or("op_no_trust")?;
            if line.balance > 0 {
                return Err("op_invalid_limit");
            }
            let released = line.sponsor.clone();
            account.trustlines.remove(asset);
            if let Some(sponsor) = released {
                let sponsor = self.account(&sponsor, "op_no_sponsor")?;
                sponsor.num_sponsoring = sponsor.num_sponsoring.saturating_sub(1);
            }
            return Ok(());
        }

        if let Some(line) = account.trustlines.get_mut(asset) {
            if limit < line.balance {
                return Err("op_invalid_limit");
            }
            line.limit = limit;
            return Ok(());
        }

        account.trustlines.insert(
            asset.clone(),
            Trustline {
                balance: 0,
                limit,
                authorized: !issuer_flags.contains(AccountFlags::AUTH_REQUIRED),
                sponsor: sponsor.clone(),
            },
        );
        if let Some(sponsor) = sponsor {
            self.account(&sponsor, "op_no_sponsor")?.num_sponsoring += 1;
        }
        Ok(())
    }

    fn set_options(&mut self, source: &str, options: &SetOptions) -> OpResult {
        let account = self.account(source, "op_no_source_account")?;

        if options.set_flags.is_some() || options.clear_flags.is_some() {
            if account.flags.contains(AccountFlags::AUTH_IMMUTABLE) {
                return Err("op_cant_change");
            }
            if let Some(clear) = options.clear_flags {
                account.flags.remove(clear);
            }
            if let Some(set) = options.set_flags {
                account.flags.insert(set);
            }
        }
        if let Some(weight) = options.master_weight {
            account.master_weight = weight;
        }
        if let Some(low) = options.low_threshold {
            account.thresholds.low = low;
        }
        if let Some(medium) = options.med_threshold {
            account.thresholds.medium = medium;
        }
        if let Some(high) = options.high_threshold {
            account.thresholds.high = high;
        }
        if let Some(domain) = &options.home_domain {
            account.home_domain = Some(domain.clone()).filter(|d| !d.is_empty());
        }
        if let Some(update) = &options.signer {
            if update.key == source || !is_valid_account_id(&update.key) {
                return Err("op_bad_signer");
            }
            let existing = account.signers.iter().position(|s| s.key == update.key);
            match (existing, update.weight) {
                (Some(i), 0) => {
                    account.signers.remove(i);
                }
                (Some(i), weight) => account.signers[i].weight = weight,
                (None, 0) => {}
                (None, weight) => {
                    if account.signers.len() >= MAX_SIGNERS {
                        return Err("op_too_many_signers");
                    }
                    account.signers.push(AccountSigner {
                        key: update.key.clone(),
                        weight,
                    });
                }
            }
        }
        Ok(())
    }

    fn clawback(&mut self, source: &str, asset: &Asset, from: &str, amount: &str) -> OpResult {
        if asset.issuer() != Some(source) {
            return Err("op_malformed");
        }
        let amount = parse_positive(amount)?;
        let issuer = self.account(source, "op_no_source_account")?;
        if !issuer.flags.contains(AccountFlags::AUTH_CLAWBACK_ENABLED) {
            return Err("op_not_clawback_enabled");
        }
        let holder = self.account(from, "op_no_trust")?;
        let line = holder.trustlines.get_mut(asset).ok_or("op_no_trust")?;
        if line.balance < amount {
            return Err("op_underfunded");
        }
        line.balance -= amount;
        Ok(())
    }

    fn merge(&mut self, source: &str, destination: &str) -> OpResult {
        if source == destination {
            return Err("op_malformed");
        }
        if !self.accounts.contains_key(destination) {
            return Err("op_no_account");
        }
        let merged = self.accounts.get(source).ok_or("op_no_source_account")?;
        if !merged.trustlines.is_empty() {
            return Err("op_has_sub_entries");
        }
        if merged.num_sponsoring > 0 {
            return Err("op_is_sponsor");
        }
        let merged = self.accounts.remove(source).ok_or("op_no_source_account")?;
        self.touched.remove(source);
        if let Some(sponsor) = &merged.sponsor {
            let sponsor = self.account(sponsor, "op_no_sponsor")?;
            sponsor.num_sponsoring = sponsor.num_sponsoring.saturating_sub(2);
        }
        self.account(destination, "op_no_account")?.native += merged.native;
        Ok(())
    }

    fn allow_trust(&mut self, source: &str, trustor: &str, code: &str, authorize: bool) -> OpResult {
        let flags = self.account(source, "op_no_source_account")?.flags;
        if !flags.intersects(AccountFlags::AUTH_REQUIRED | AccountFlags::AUTH_REVOCABLE) {
            return Err("op_trust_not_required");
        }
        if !authorize && !flags.contains(AccountFlags::AUTH_REVOCABLE) {
            return Err("op_cant_revoke");
        }
        let asset = Asset::credit(code, source).map_err(|_| "op_malformed")?;
        let holder = self.account(trustor, "op_no_trust_line")?;
        let line = holder
            .trustlines
            .get_mut(&asset)
            .ok_or("op_no_trust_line")?;
        line.authorized = authorize;
        Ok(())
    }
}

// =============================================================================
// LedgerClient
// =============================================================================

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn load_account(
        &self,
        account_id: &str,
    ) -> Result<Option<LedgerAccountState>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .get(account_id)
            .map(|record| record.to_state(account_id)))
    }

    async fn fee_stats(&self) -> Result<FeeStats, LedgerError> {
        self.state
            .read()
            .await
            .fee_stats
            .ok_or_else(|| LedgerError::Transport("fee stats unavailable".to_string()))
    }

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitReceipt, LedgerError> {
        let mut state = self.state.write().await;
        let ledger = state.ledger;
        match self.apply_envelope(&mut state, envelope) {
            Ok(hash) => {
                log::debug!("Sandbox applied {} in ledger {}", hash, ledger);
                Ok(SubmitReceipt { hash, ledger })
            }
            Err(code) => {
                log::debug!("Sandbox rejected transaction: {}", code);
                Err(LedgerError::Rejected(code))
            }
        }
    }

    async fn accounts_by_asset(
        &self,
        asset: &Asset,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<AccountsPage, LedgerError> {
        let state = self.state.read().await;
        let records: Vec<LedgerAccountState> = state
            .accounts
            .iter()
            .filter(|(id, _)| cursor.map_or(true, |c| id.as_str() > c))
            .filter(|(_, record)| record.trustlines.contains_key(asset))
            .take(limit.max(1))
            .map(|(id, record)| record.to_state(id))
            .collect();
        let next_cursor = records.last().map(|r| r.account_id.clone());
        Ok(AccountsPage {
            records,
            next_cursor,
        })
    }

    async fn asset_exists(&self, asset: &Asset) -> Result<bool, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .any(|record| record.trustlines.contains_key(asset)))
    }

    async fn fund_via_faucet(&self, account_id: &str) -> Result<(), LedgerError> {
        if !self.network.has_faucet() {
            return Err(LedgerError::FaucetUnavailable(self.network));
        }
        self.create_account(account_id, FAUCET_AMOUNT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SignerUpdate, TransactionBuilder};
    use crate::crypto::KeyPair;

    async fn funded(ledger: &MemoryLedger, amount: &str) -> KeyPair {
        let kp = KeyPair::generate();
        ledger.fund_account(&kp.account_id(), amount).await.unwrap();
        kp
    }

    async fn build(ledger: &MemoryLedger, source: &KeyPair, ops: Vec<Operation>) -> Transaction {
        let state = ledger
            .load_account(&source.account_id())
            .await
            .unwrap()
            .unwrap();
        TransactionBuilder::new(ledger.network(), &source.account_id(), state.sequence, 100)
            .add_operations(ops)
            .set_timeout(30)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_native_payment() {
        let ledger = MemoryLedger::new(Network::Testnet);
        let alice = funded(&ledger, "100").await;
        let bob = funded(&ledger, "10").await;

        let mut tx = build(
            &ledger,
            &alice,
            vec![Operation::payment(&bob.account_id(), Asset::Native, "5")],
        )
        .await;
        tx.sign(&alice).unwrap();
        let receipt = ledger.submit(&TransactionEnvelope::Tx(tx.clone())).await.unwrap();
        assert_eq!(receipt.hash, tx.hash_hex().unwrap());

        let bob_state = ledger.load_account(&bob.account_id()).await.unwrap().unwrap();
        assert_eq!(bob_state.native_balance(), 15.0);
        let alice_state = ledger.load_account(&alice.account_id()).await.unwrap().unwrap();
        assert_eq!(alice_state.balance_for(&Asset::Native).unwrap().balance, "94.99999");
        assert_eq!(alice_state.sequence, tx.sequence);
    }

    #[tokio::test]
    async fn test_rejects_unsigned_and_bad_sequence() {
        let ledger = MemoryLedger::new(Network::Testnet);
        let alice = funded(&ledger, "100").await;
        let bob = funded(&ledger, "10").await;
        let op = Operation::payment(&bob.account_id(), Asset::Native, "1");

        let tx = build(&ledger, &alice, vec![op.clone()]).await;
        let err = ledger.submit(&TransactionEnvelope::Tx(tx.clone())).await.unwrap_err();
        assert_eq!(err, LedgerError::Rejected("tx_bad_auth".to_string()));

        let mut stale = tx;
        stale.sequence += 5;
        stale.sign(&alice).unwrap();
        let err = ledger.submit(&TransactionEnvelope::Tx(stale)).await.unwrap_err();
        assert_eq!(err, LedgerError::Rejected("tx_bad_seq".to_string()));
        assert_eq!(ledger.applied_count().await, 0);
    }

    #[tokio::test]
    async fn test_threshold_weights_enforced() {
        let ledger = MemoryLedger::new(Network::Testnet);
        let owner = funded(&ledger, "100").await;
        let cosigner = KeyPair::generate();

        let mut tx = build(
            &ledger,
            &owner,
            vec![Operation::set_options(SetOptions {
                signer: Some(SignerUpdate {
                    key: cosigner.account_id(),
                    weight: 1,
                }),
                low_threshold: Some(1),
                med_threshold: Some(2),
                high_threshold: Some(2),
                ..Default::default()
            })],
        )
        .await;
        tx.sign(&owner).unwrap();
        ledger.submit(&TransactionEnvelope::Tx(tx)).await.unwrap();

        let dest = funded(&ledger, "10").await;
        let pay = Operation::payment(&dest.account_id(), Asset::Native, "1");

        let mut single = build(&ledger, &owner, vec![pay.clone()]).await;
        single.sign(&owner).unwrap();
        let err = ledger.submit(&TransactionEnvelope::Tx(single)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(code) if code.contains("op_bad_auth")));

        let mut both = build(&ledger, &owner, vec![pay]).await;
        both.sign(&owner).unwrap();
        both.sign(&cosigner).unwrap();
        ledger.submit(&TransactionEnvelope::Tx(both)).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_operation_rolls_back() {
        let ledger = MemoryLedger::new(Network::Testnet);
        let alice = funded(&ledger, "100").await;
        let bob = funded(&ledger, "10").await;

        let mut tx = build(
            &ledger,
            &alice,
            vec![
                Operation::payment(&bob.account_id(), Asset::Native, "5"),
                Operation::payment(&bob.account_id(), Asset::Native, "5000"),
            ],
        )
        .await;
        tx.sign(&alice).unwrap();
        assert!(ledger.submit(&TransactionEnvelope::Tx(tx)).await.is_err());

        let bob_state = ledger.load_account(&bob.account_id()).await.unwrap().unwrap();
        assert_eq!(bob_state.native_balance(), 10.0);
    }

    #[tokio::test]
    async fn test_sponsored_trustline_and_reserve() {
        let ledger = MemoryLedger::new(Network::Testnet);
        let issuer = funded(&ledger, "100").await;
        let holder = funded(&ledger, "1").await;
        let asset = Asset::credit("USDC", &issuer.account_id()).unwrap();

        let mut unsponsored =
            build(&ledger, &holder, vec![Operation::change_trust(asset.clone())]).await;
        unsponsored.fee = 100;
        unsponsored.sign(&holder).unwrap();
        let err = ledger
            .submit(&TransactionEnvelope::Tx(unsponsored))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(code) if code.contains("low_reserve")));

        let mut sponsored = build(
            &ledger,
            &issuer,
            vec![
                Operation::begin_sponsoring(&holder.account_id()),
                Operation::change_trust(asset.clone()).with_source(holder.account_id()),
                Operation::end_sponsoring().with_source(holder.account_id()),
            ],
        )
        .await;
        sponsored.sign(&issuer).unwrap();
        sponsored.sign(&holder).unwrap();
        ledger.submit(&TransactionEnvelope::Tx(sponsored)).await.unwrap();

        let page = ledger.accounts_by_asset(&asset, None, 10).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(ledger.asset_exists(&asset).await.unwrap());
    }

    #[tokio::test]
    async fn test_fee_bump_charges_payer() {
        let ledger = MemoryLedger::new(Network::Testnet);
        let alice = funded(&ledger, "100").await;
        let payer = funded(&ledger, "100").await;
        let bob = funded(&ledger, "10").await;

        let mut inner = build(
            &ledger,
            &alice,
            vec![Operation::payment(&bob.account_id(), Asset::Native, "1")],
        )
        .await;
        inner.sign(&alice).unwrap();
        let mut bump = FeeBumpTransaction::new(&payer.account_id(), 1000, inner);
        bump.sign(&payer).unwrap();

        ledger.submit(&TransactionEnvelope::FeeBump(bump)).await.unwrap();
        let payer_state = ledger.load_account(&payer.account_id()).await.unwrap().unwrap();
        assert_eq!(payer_state.balance_for(&Asset::Native).unwrap().balance, "99.9998");
        let alice_state = ledger.load_account(&alice.account_id()).await.unwrap().unwrap();
        assert_eq!(alice_state.native_balance(), 99.0);
    }

    #[tokio::test]
    async fn test_faucet_only_on_testnet() {
        let testnet = MemoryLedger::new(Network::Testnet);
        let kp = KeyPair::generate();
        testnet.fund_via_faucet(&kp.account_id()).await.unwrap();
        assert!(testnet.fund_via_faucet(&kp.account_id()).await.is_err());

        let public = MemoryLedger::new(Network::Public);
        assert!(matches!(
            public.fund_via_faucet(&kp.account_id()).await,
            Err(LedgerError::FaucetUnavailable(Network::Public))
        ));
    }
}
