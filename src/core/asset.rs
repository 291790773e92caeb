//! Asset references and the asset identifier parser
//!
//! Identifiers are either the native code (`XLM`) or `CODE:ISSUER`.

use crate::crypto::is_valid_account_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of the native asset
pub const NATIVE_CODE: &str = "XLM";

/// Maximum length of a credit asset code
pub const MAX_ASSET_CODE_LEN: usize = 12;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("Invalid asset code: {0}")]
    InvalidCode(String),
    #[error("Invalid asset issuer: {0}")]
    InvalidIssuer(String),
    #[error("Malformed asset identifier: {0}")]
    Malformed(String),
}

/// A canonical asset reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    Native,
    Credit { code: String, issuer: String },
}

impl Asset {
    pub fn native() -> Self {
        Asset::Native
    }

    /// Build a credit asset, validating code and issuer
    pub fn credit(code: &str, issuer: &str) -> Result<Self, AssetError> {
        validate_code(code)?;
        if !is_valid_account_id(issuer) {
            return Err(AssetError::InvalidIssuer(issuer.to_string()));
        }
        Ok(Asset::Credit {
            code: code.to_string(),
            issuer: issuer.to_string(),
        })
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    /// Asset code; the native asset reports `XLM`
    pub fn code(&self) -> &str {
        match self {
            Asset::Native => NATIVE_CODE,
            Asset::Credit { code, .. } => code,
        }
    }

    pub fn issuer(&self) -> Option<&str> {
        match self {
            Asset::Native => None,
            Asset::Credit { issuer, .. } => Some(issuer),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "{}", NATIVE_CODE),
            Asset::Credit { code, issuer } => write!(f, "{}:{}", code, issuer),
        }
    }
}

impl FromStr for Asset {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetResolver::resolve(s)
    }
}

/// Parses asset identifier strings into canonical asset references
pub struct AssetResolver;

impl AssetResolver {
    /// Resolve `XLM` or `CODE:ISSUER`
    pub fn resolve(identifier: &str) -> Result<Asset, AssetError> {
        let identifier = identifier.trim();
        if identifier == NATIVE_CODE {
            return Ok(Asset::Native);
        }
        match identifier.split(':').collect::<Vec<_>>().as_slice() {
            [code, issuer] => Asset::credit(code, issuer),
            _ => Err(AssetError::Malformed(identifier.to_string())),
        }
    }
}

fn validate_code(code: &str) -> Result<(), AssetError> {
    if code.is_empty()
        || code.len() > MAX_ASSET_CODE_LEN
        || !code.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(AssetError::InvalidCode(code.to_string()));
    }
    Ok(())
}
