//! Network selection

use crate::crypto::network_id;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Which ledger network transactions are bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    #[serde(alias = "TESTNET")]
    Testnet,
    #[serde(alias = "PUBLIC")]
    Public,
}

impl Network {
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Testnet => TESTNET_PASSPHRASE,
            Network::Public => PUBLIC_PASSPHRASE,
        }
    }

    /// SHA-256 of the passphrase; mixed into every transaction hash
    pub fn id(&self) -> Vec<u8> {
        network_id(self.passphrase())
    }

    /// Only the test network has a faucet
    pub fn has_faucet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => write!(f, "testnet"),
            Network::Public => write!(f, "public"),
        }
    }
}
