//! Ledger data model
//!
//! This module contains the building blocks the engine assembles:
//! - Amounts (decimal strings over integer stroops)
//! - Assets and the asset identifier resolver
//! - Memos and memo validation
//! - Operations (closed set, each with a fixed threshold category)
//! - Account state snapshots as reported by the ledger
//! - Fee stats and fee selection
//! - Transactions, the transaction builder and fee-bump envelopes

pub mod account;
pub mod amount;
pub mod asset;
pub mod fee;
pub mod memo;
pub mod network;
pub mod operation;
pub mod transaction;

pub use account::{
    native_balance, AccountFlags, AccountSigner, Balance, LedgerAccountState, Thresholds,
};
pub use amount::{
    amount_from_f64, balance_to_f64, format_amount, format_f64, parse_amount, AmountError,
    STROOPS_PER_UNIT,
};
pub use asset::{Asset, AssetError, AssetResolver, NATIVE_CODE};
pub use fee::{
    select_fee, total_fee, FeeLevel, FeeStats, ADMIN_TIMEOUT_SECS, BASE_FEE, PAYMENT_TIMEOUT_SECS,
};
pub use memo::{validate_memo, Memo, MemoError, MemoValue};
pub use network::Network;
pub use operation::{Operation, OperationBody, SetOptions, SignerUpdate, ThresholdCategory};
pub use transaction::{
    DecoratedSignature, FeeBumpTransaction, TimeBounds, Transaction, TransactionBuilder,
    TransactionEnvelope, TransactionError, MAX_OPERATIONS,
};
