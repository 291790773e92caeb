//! Trustline bootstrap
//!
//! Before a non-native payment reaches a recipient, the recipient must
//! trust the asset and hold enough native balance to carry the extra
//! reserve. When headroom is short, a configured sponsor tops it up in the
//! same transaction.

use crate::core::{native_balance, Asset, Balance, Operation};
use crate::engine::error::EngineError;

// =============================================================================
// Constants
// =============================================================================

/// Reserve held per trustline
pub const TRUSTLINE_RESERVE: f64 = 0.5;

/// Minimum headroom needed to open one more trustline
pub const MIN_HEADROOM: f64 = 1.5;

/// Extra margin on top of `MIN_HEADROOM` for one pending operation
pub const SAFETY_BUFFER: f64 = 0.5;

/// Native amount a sponsor sends when headroom is short
pub const SPONSOR_TOP_UP: &str = "0.5";

/// Inputs for one trustline decision
#[derive(Debug, Clone, Copy)]
pub struct TrustlineRequest<'a> {
    pub recipient: &'a str,
    pub asset: &'a Asset,
    /// Recipient balances as currently on the ledger
    pub balances: &'a [Balance],
    /// Public key of the account funding the top-up, if any
    pub sponsor: Option<&'a str>,
}

pub struct TrustlineBootstrapper;

impl TrustlineBootstrapper {
    /// Native balance left after trustline reserves
    pub fn headroom(balances: &[Balance]) -> f64 {
        let trustlines = balances.iter().filter(|b| !b.asset.is_native()).count();
        native_balance(balances) - trustlines as f64 * TRUSTLINE_RESERVE
    }

    /// Operations to insert before a payment of `asset` to the recipient.
    ///
    /// Empty when the recipient already holds the asset. Otherwise an
    /// optional sponsor top-up followed by a `ChangeTrust` sourced from the
    /// recipient, whose key must then sign.
    pub fn plan(request: TrustlineRequest<'_>) -> Result<Vec<Operation>, EngineError> {
        if request.asset.is_native() || request.balances.iter().any(|b| &b.asset == request.asset)
        {
            return Ok(Vec::new());
        }

        let mut ops = Vec::with_capacity(2);
        let headroom = Self::headroom(request.balances);
        let required = MIN_HEADROOM + SAFETY_BUFFER;
        if headroom < required {
            let sponsor = request
                .sponsor
                .ok_or_else(|| EngineError::InsufficientReserve {
                    account: request.recipient.to_string(),
                    headroom,
                    required,
                })?;
            log::info!(
                "Topping up {} by {} from sponsor {} (headroom {})",
                request.recipient,
                SPONSOR_TOP_UP,
                sponsor,
                headroom
            );
            ops.push(
                Operation::payment(request.recipient, Asset::Native, SPONSOR_TOP_UP)
                    .with_source(sponsor),
            );
        }

        ops.push(Operation::change_trust(request.asset.clone()).with_source(request.recipient));
        Ok(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OperationBody;
    use crate::crypto::KeyPair;

    fn native(amount: &str) -> Balance {
        Balance {
            asset: Asset::Native,
            balance: amount.to_string(),
            limit: None,
            authorized: true,
        }
    }

    fn line(asset: &Asset, amount: &str) -> Balance {
        Balance {
            asset: asset.clone(),
            balance: amount.to_string(),
            limit: Some("1000".to_string()),
            authorized: true,
        }
    }

    fn gold() -> Asset {
        Asset::credit("GOLD", &KeyPair::generate().account_id()).unwrap()
    }

    #[test]
    fn test_existing_trustline_adds_nothing() {
        let asset = gold();
        let balances = vec![native("0.1"), line(&asset, "0")];
        let ops = TrustlineBootstrapper::plan(TrustlineRequest {
            recipient: "recipient",
            asset: &asset,
            balances: &balances,
            sponsor: None,
        })
        .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_same_code_other_issuer_is_not_present() {
        let asset = gold();
        let other = Asset::credit("GOLD", &KeyPair::generate().account_id()).unwrap();
        let balances = vec![native("10"), line(&other, "5")];
        let ops = TrustlineBootstrapper::plan(TrustlineRequest {
            recipient: "recipient",
            asset: &asset,
            balances: &balances,
            sponsor: None,
        })
        .unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_low_headroom_with_sponsor_prepends_top_up() {
        let asset = gold();
        let balances = vec![native("1.0")];
        let ops = TrustlineBootstrapper::plan(TrustlineRequest {
            recipient: "recipient",
            asset: &asset,
            balances: &balances,
            sponsor: Some("sponsor"),
        })
        .unwrap();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].source.as_deref(), Some("sponsor"));
        assert_eq!(
            ops[0].body,
            OperationBody::Payment {
                destination: "recipient".to_string(),
                asset: Asset::Native,
                amount: "0.5".to_string(),
            }
        );
        assert_eq!(ops[1].source.as_deref(), Some("recipient"));
        assert!(matches!(ops[1].body, OperationBody::ChangeTrust { limit: None, .. }));
    }

    #[test]
    fn test_enough_headroom_skips_top_up() {
        let asset = gold();
        let balances = vec![native("3.0"), line(&gold(), "1")];
        let ops = TrustlineBootstrapper::plan(TrustlineRequest {
            recipient: "recipient",
            asset: &asset,
            balances: &balances,
            sponsor: Some("sponsor"),
        })
        .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind(), "change_trust");
    }

    #[test]
    fn test_low_headroom_without_sponsor_fails() {
        let asset = gold();
        let balances = vec![native("1.0")];
        let err = TrustlineBootstrapper::plan(TrustlineRequest {
            recipient: "recipient",
            asset: &asset,
            balances: &balances,
            sponsor: None,
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientReserve { .. }));
    }

    #[test]
    fn test_headroom() {
        let balances = vec![native("3.0"), line(&gold(), "1"), line(&gold(), "2")];
        assert_eq!(TrustlineBootstrapper::headroom(&balances), 2.0);
    }
}
