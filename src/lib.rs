//! Ledger Assembler: signer resolution and transaction assembly in Rust
//!
//! This crate builds, signs and submits multi-operation transactions for a
//! ledger whose accounts use weighted multi-signature thresholds:
//! - Role-keyed account directory with co-signer references
//! - Per-operation threshold checks against live ledger weights
//! - Trustline bootstrap with sponsor-funded reserve top-ups
//! - Submit, return-for-external-signature, or fee-bump escalation
//! - Domain events after confirmed submissions
//! - An in-memory sandbox ledger
//!
//! # Example
//!
//! ```rust,no_run
//! use ledger_assembler::core::Network;
//! use ledger_assembler::directory::{AccountDefinition, AccountDirectory};
//! use ledger_assembler::engine::{AssemblerSettings, TransactionAssembler};
//! use ledger_assembler::ledger::MemoryLedger;
//! use ledger_assembler::KeyPair;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let issuer = KeyPair::generate();
//! let ledger = Arc::new(MemoryLedger::new(Network::Testnet));
//! ledger.fund_account(&issuer.account_id(), "100").await?;
//!
//! let directory = AccountDirectory::new(vec![
//!     AccountDefinition::new("issuer").with_secret(&issuer.secret()),
//! ])?;
//! let settings = AssemblerSettings {
//!     issuer: Some("issuer".to_string()),
//!     ..Default::default()
//! };
//! let assembler = TransactionAssembler::new(settings, Arc::new(directory), ledger)?;
//!
//! let outcome = assembler.issue_asset("GOLD", "1000", None).await?;
//! println!("Issued: {:?}", outcome.hash());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod directory;
pub mod engine;
pub mod ledger;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use core::{
    Asset, AssetResolver, Memo, Network, Operation, OperationBody, Transaction,
    TransactionBuilder, TransactionEnvelope,
};
pub use crypto::KeyPair;
pub use directory::{AccountDefinition, AccountDirectory};
pub use engine::{
    EngineError, EngineEvent, FeeBumpEscalator, SignerResolver, SubmissionOutcome,
    TransactionAssembler, TrustlineBootstrapper,
};
pub use ledger::{LedgerClient, LedgerError, MemoryLedger};
