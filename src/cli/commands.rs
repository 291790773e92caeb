//! CLI commands for the assembler
//!
//! Implements all command handlers for the CLI interface.

use crate::config::EngineConfig;
use crate::core::{
    validate_memo, Asset, MemoValue, Network, SetOptions, SignerUpdate, TransactionEnvelope,
};
use crate::crypto::KeyPair;
use crate::directory::{AccountDefinition, AccountDirectory};
use crate::engine::{
    AssemblerSettings, ClawbackAllOutcome, PaymentLine, Recipient, SubmissionOutcome,
    TransactionAssembler,
};
use crate::ledger::{LedgerClient, MemoryLedger};
use std::path::Path;
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Native balance given to every sandbox role
const SANDBOX_FUNDING: &str = "1000";

/// Generate a fresh key pair
pub fn cmd_keygen() -> CliResult<()> {
    let key = KeyPair::generate();
    println!("🔑 New key pair");
    println!("   Account: {}", key.account_id());
    println!("   Secret:  {}", key.secret());
    println!();
    println!("⚠️  Store the secret somewhere safe; it is not saved anywhere.");
    Ok(())
}

/// Load and validate a configuration file
pub fn cmd_check_config(path: &Path) -> CliResult<()> {
    println!("📂 Loading configuration from {:?}...", path);
    let config = EngineConfig::from_file(path)?;
    let (directory, settings) = config.validate()?;

    println!("✅ Configuration is valid");
    println!("   Network:     {}", settings.network);
    println!("   Base fee:    {} stroops/op", settings.base_fee);
    println!(
        "   Timeouts:    {}s payments, {}s admin",
        settings.payment_timeout, settings.admin_timeout
    );
    println!("   Trustlines:  {}", settings.base_trustlines.len());
    println!();
    println!("👥 Roles ({}):", directory.len());
    for account in directory.accounts() {
        let co_signers = if account.co_signer_roles().is_empty() {
            "-".to_string()
        } else {
            account.co_signer_roles().join(", ")
        };
        println!(
            "   {:<16} {} {} co-signers: {}",
            account.role(),
            account.public_key(),
            if account.has_secret() { "🔓" } else { "🔒" },
            co_signers
        );
    }
    Ok(())
}

/// Show how a value maps onto a memo
pub fn cmd_memo(value: &str) -> CliResult<()> {
    let input = if let Some(hex_value) = value.strip_prefix("0x") {
        MemoValue::Binary(hex::decode(hex_value)?)
    } else if let Ok(id) = value.parse::<u64>() {
        MemoValue::Number(id)
    } else {
        MemoValue::Text(value.to_string())
    };

    match validate_memo(input) {
        Ok(memo) => println!("📝 {}", serde_json::to_string(&memo)?),
        Err(e) => println!("❌ {}", e),
    }
    Ok(())
}

fn print_outcome(label: &str, outcome: &SubmissionOutcome) {
    match outcome {
        SubmissionOutcome::Submitted { hash, ledger } => {
            println!("✅ {}: {} (ledger {})", label, hash, ledger);
        }
        SubmissionOutcome::Returned {
            envelope, reason, ..
        } => {
            println!("📤 {}: returned ({:?})", label, reason);
            println!("   Envelope: {}", envelope);
        }
        SubmissionOutcome::Rejected { hash, error } => {
            println!("❌ {}: {} rejected: {}", label, hash, error);
        }
    }
}

/// Run a scripted flow against an in-memory ledger
pub async fn cmd_sandbox() -> CliResult<()> {
    let ledger = Arc::new(MemoryLedger::new(Network::Testnet));
    let creator = KeyPair::generate();
    let issuer = KeyPair::generate();
    let auditor = KeyPair::generate();
    let distributor = KeyPair::generate();

    println!("🧪 Sandbox ledger on {}", ledger.network());
    for (role, key) in [
        ("creator", &creator),
        ("issuer", &issuer),
        ("auditor", &auditor),
        ("distributor", &distributor),
    ] {
        ledger.fund_account(&key.account_id(), SANDBOX_FUNDING).await?;
        println!("   Funded {:<12} {}", role, key.account_id());
    }

    let directory = AccountDirectory::new(vec![
        AccountDefinition::new("creator").with_secret(&creator.secret()),
        AccountDefinition::new("issuer")
            .with_secret(&issuer.secret())
            .with_co_signer("auditor"),
        AccountDefinition::new("auditor").with_secret(&auditor.secret()),
        AccountDefinition::new("distributor").with_secret(&distributor.secret()),
    ])?;
    let gold = Asset::credit("GOLD", &issuer.account_id())?;
    let settings = AssemblerSettings {
        network: ledger.network(),
        emit_events: true,
        account_creator: Some("creator".to_string()),
        issuer: Some("issuer".to_string()),
        distributor: Some("distributor".to_string()),
        base_trustlines: vec![gold.clone()],
        ..Default::default()
    };
    let assembler = TransactionAssembler::new(settings, Arc::new(directory), ledger.clone())?;
    let mut events = assembler.events().subscribe();

    // Issuer now needs the auditor for anything above low
    println!();
    println!("🔐 Configuring issuer multisig...");
    let envelope = assembler
        .add_signers(
            &issuer.account_id(),
            &[SignerUpdate {
                key: auditor.account_id(),
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
        .await?;
    println!("   Unsigned envelope: {}", envelope);
    if let TransactionEnvelope::Tx(mut tx) = TransactionEnvelope::decode(&envelope)? {
        tx.sign(&issuer)?;
        let receipt = ledger.submit(&TransactionEnvelope::Tx(tx)).await?;
        println!("✅ Signers added: {}", receipt.hash);
    }

    println!();
    print_outcome(
        "Issued GOLD",
        &assembler.issue_asset("GOLD", "10000", None).await?,
    );

    let created = assembler.create_account(None).await?;
    print_outcome("Created account", &created.outcome);
    println!("   Account: {}", created.keypair.account_id());

    let line = PaymentLine::new(
        &gold.to_string(),
        "250",
        Recipient::PublicKey(created.keypair.account_id()),
    )
    .with_memo("welcome");
    print_outcome(
        "Paid 250 GOLD",
        &assembler.send_admin_payment(&[line], false).await?,
    );

    match assembler.clawback_all("GOLD").await? {
        ClawbackAllOutcome::NoAccountsFound => println!("ℹ️  No accounts hold GOLD"),
        ClawbackAllOutcome::Processed { pages } => {
            for (index, outcome) in pages.iter().enumerate() {
                print_outcome(&format!("Clawback page {}", index + 1), outcome);
            }
        }
    }

    println!();
    println!("📣 Events:");
    while let Ok(event) = events.try_recv() {
        println!("   {}", serde_json::to_string(&event)?);
    }
    println!("   {} transactions applied", ledger.applied_count().await);
    Ok(())
}
