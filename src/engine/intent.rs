//! Caller-facing intent inputs

use crate::core::MemoValue;

/// Who receives a payment.
///
/// A recipient given by secret can have a trustline opened for it in the
/// same transaction; one given by public key cannot.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    PublicKey(String),
    Secret(String),
}

/// One payment within a payment intent
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLine {
    /// `XLM` or `CODE:ISSUER`
    pub asset: String,
    /// Decimal amount
    pub amount: String,
    pub to: Recipient,
    pub memo: Option<MemoValue>,
    /// Role that funds the recipient's reserve top-up, if needed
    pub trustline_sponsor: Option<String>,
}

impl PaymentLine {
    pub fn new(asset: &str, amount: &str, to: Recipient) -> Self {
        Self {
            asset: asset.to_string(),
            amount: amount.to_string(),
            to,
            memo: None,
            trustline_sponsor: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<MemoValue>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_trustline_sponsor(mut self, role: &str) -> Self {
        self.trustline_sponsor = Some(role.to_string());
        self
    }
}

/// One side of a two-party swap
#[derive(Debug, Clone, PartialEq)]
pub struct SwapLeg {
    pub from_secret: String,
    /// Asset this party sends
    pub asset: String,
    pub amount: String,
    pub memo: Option<MemoValue>,
}

impl SwapLeg {
    pub fn new(from_secret: &str, asset: &str, amount: &str) -> Self {
        Self {
            from_secret: from_secret.to_string(),
            asset: asset.to_string(),
            amount: amount.to_string(),
            memo: None,
        }
    }
}

/// An asset identifier with an amount
#[derive(Debug, Clone, PartialEq)]
pub struct AssetAmount {
    pub asset: String,
    pub amount: String,
}

impl AssetAmount {
    pub fn new(asset: &str, amount: &str) -> Self {
        Self {
            asset: asset.to_string(),
            amount: amount.to_string(),
        }
    }
}
