//! Fee handling
//!
//! Fees are quoted per operation. The ledger reports two reference points:
//! - the mode of fees actually charged (used for ordinary transactions)
//! - the mode of max fees bid (used when a transaction must get in quickly)

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Static per-operation fee used when fee stats are unavailable (stroops)
pub const BASE_FEE: u32 = 100;

/// Transaction validity window for payments (seconds)
pub const PAYMENT_TIMEOUT_SECS: i64 = 30;

/// Transaction validity window for admin/issuer transactions (seconds)
pub const ADMIN_TIMEOUT_SECS: i64 = 180;

// =============================================================================
// Fee Stats
// =============================================================================

/// Per-operation fee reference points reported by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStats {
    /// Mode of fees charged in recent ledgers
    pub base_fee_mode: u32,
    /// Mode of max fees bid in recent ledgers
    pub max_fee_mode: u32,
}

impl Default for FeeStats {
    fn default() -> Self {
        Self {
            base_fee_mode: BASE_FEE,
            max_fee_mode: BASE_FEE,
        }
    }
}

/// Which reference point a transaction is priced at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeLevel {
    Base,
    Max,
}

/// Pick a per-operation fee, falling back to `fallback` when stats are
/// missing or report zero
pub fn select_fee(stats: Option<FeeStats>, level: FeeLevel, fallback: u32) -> u32 {
    let quoted = stats.map(|s| match level {
        FeeLevel::Base => s.base_fee_mode,
        FeeLevel::Max => s.max_fee_mode,
    });
    match quoted {
        Some(fee) if fee > 0 => fee,
        _ => fallback,
    }
}

/// Total fee for a transaction with `op_count` operations
pub fn total_fee(fee_per_op: u32, op_count: usize) -> u64 {
    fee_per_op as u64 * op_count.max(1) as u64
}
