//! Ledger access
//!
//! - `LedgerClient`: the async port the engine talks to
//! - `MemoryLedger`: an in-process ledger used for the sandbox and tests

pub mod client;
pub mod memory;
#[cfg(test)]
pub(crate) mod stub;

pub use client::{AccountsPage, LedgerClient, LedgerError, SubmitReceipt};
pub use memory::{MemoryLedger, BASE_RESERVE, FAUCET_AMOUNT};
