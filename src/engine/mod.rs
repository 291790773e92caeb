//! Signer resolution and transaction assembly
//!
//! This module provides:
//! - `SignerResolver`: which held keys sign, and whether they reach thresholds
//! - `TrustlineBootstrapper`: reserve top-ups and trustlines ahead of payments
//! - `TransactionAssembler`: intents to submitted or returned transactions
//! - `FeeBumpEscalator`: re-priced outer envelopes for signed transactions
//! - `EventBus`: domain events after confirmed submissions

pub mod assembler;
pub mod assets;
pub mod error;
pub mod events;
pub mod fee_bump;
pub mod intent;
pub mod outcome;
pub mod payments;
pub mod signers;
pub mod trustline;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::{AssemblerSettings, TransactionAssembler, BASE_STARTING_BALANCE};
pub use assets::CLAWBACK_PAGE_SIZE;
pub use error::EngineError;
pub use events::{EngineEvent, EventBus};
pub use fee_bump::{FeeBumpEscalator, FeePayer};
pub use intent::{AssetAmount, PaymentLine, Recipient, SwapLeg};
pub use outcome::{ClawbackAllOutcome, CreatedAccount, ReturnReason, SubmissionOutcome};
pub use signers::{SignerResolution, SignerResolver, SignerSet, ThresholdCheck};
pub use trustline::{
    TrustlineBootstrapper, TrustlineRequest, MIN_HEADROOM, SAFETY_BUFFER, SPONSOR_TOP_UP,
    TRUSTLINE_RESERVE,
};
