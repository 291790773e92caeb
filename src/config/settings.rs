//! Engine configuration file
//!
//! Read once at startup and turned into the account directory and the
//! assembler settings. Nothing here touches the network.

use crate::core::{
    parse_amount, Asset, AssetError, AssetResolver, Network, ADMIN_TIMEOUT_SECS, BASE_FEE,
    PAYMENT_TIMEOUT_SECS,
};
use crate::directory::{AccountDefinition, AccountDirectory, DirectoryError};
use crate::engine::{AssemblerSettings, EngineError, TransactionAssembler};
use crate::ledger::LedgerClient;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Environment variable {var} for role {role} is not set")]
    MissingEnv { role: String, var: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Selects the network passphrase; the faucet exists only on testnet
    pub mode: Network,
    pub emit_events: bool,
    pub account: AccountSection,
    pub payments: PaymentsSection,
    pub fees: FeesSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSection {
    pub config: AccountCreation,
    pub accounts: Vec<AccountEntry>,
}

/// How new accounts are created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountCreation {
    pub create_by: Option<String>,
    pub sponsor_by: Option<String>,
    pub starting: StartingSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingSection {
    pub balance: Option<String>,
    pub home_domain: Option<String>,
    pub base_trustlines: Vec<TrustlineEntry>,
}

/// `"CODE:ISSUER"`, or one identifier per network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrustlineEntry {
    Asset(String),
    PerNetwork {
        #[serde(default)]
        testnet: Option<String>,
        #[serde(default)]
        public: Option<String>,
    },
}

impl TrustlineEntry {
    /// Asset for `network`; `None` when the entry has nothing for it
    pub fn resolve(&self, network: Network) -> Result<Option<Asset>, AssetError> {
        let identifier = match (self, network) {
            (TrustlineEntry::Asset(id), _) => Some(id),
            (TrustlineEntry::PerNetwork { testnet, .. }, Network::Testnet) => testnet.as_ref(),
            (TrustlineEntry::PerNetwork { public, .. }, Network::Public) => public.as_ref(),
        };
        identifier.map(|id| AssetResolver::resolve(id)).transpose()
    }
}

/// One role in the account table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountEntry {
    pub role: String,
    pub public: Option<String>,
    pub secret: Option<String>,
    /// Environment variable holding the secret
    pub secret_env: Option<String>,
    /// Co-signer roles
    pub signers: Vec<String>,
}

/// Issuer and distributor roles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsSection {
    /// Issuer role
    pub create_by: Option<String>,
    /// Distributor role
    pub pay_by: Option<String>,
    pub sponsor_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeesSection {
    /// Per-operation fee used when fee stats are unavailable
    pub base_fee: u32,
    pub timeout_secs: i64,
    pub admin_timeout_secs: i64,
}

impl Default for FeesSection {
    fn default() -> Self {
        Self {
            base_fee: BASE_FEE,
            timeout_secs: PAYMENT_TIMEOUT_SECS,
            admin_timeout_secs: ADMIN_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Save configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Account definitions with environment secrets read in
    pub fn definitions(&self) -> Result<Vec<AccountDefinition>, ConfigError> {
        self.account
            .accounts
            .iter()
            .map(|entry| {
                let secret = match (&entry.secret, &entry.secret_env) {
                    (Some(secret), _) => Some(secret.clone()),
                    (None, Some(var)) => Some(std::env::var(var).map_err(|_| {
                        ConfigError::MissingEnv {
                            role: entry.role.clone(),
                            var: var.clone(),
                        }
                    })?),
                    (None, None) => None,
                };
                Ok(AccountDefinition {
                    role: entry.role.clone(),
                    public_key: entry.public.clone(),
                    secret,
                    co_signer_roles: entry.signers.clone(),
                })
            })
            .collect()
    }

    pub fn directory(&self) -> Result<AccountDirectory, ConfigError> {
        Ok(AccountDirectory::new(self.definitions()?)?)
    }

    /// Base trustlines that apply to the configured network
    pub fn base_trustlines(&self) -> Result<Vec<Asset>, ConfigError> {
        let mut assets = Vec::new();
        for entry in &self.account.config.starting.base_trustlines {
            if let Some(asset) = entry.resolve(self.mode)? {
                assets.push(asset);
            }
        }
        Ok(assets)
    }

    pub fn settings(&self) -> Result<AssemblerSettings, ConfigError> {
        let creation = &self.account.config;
        Ok(AssemblerSettings {
            network: self.mode,
            emit_events: self.emit_events,
            account_creator: creation.create_by.clone(),
            account_sponsor: creation.sponsor_by.clone(),
            starting_balance: creation.starting.balance.clone(),
            home_domain: creation.starting.home_domain.clone(),
            base_trustlines: self.base_trustlines()?,
            issuer: self.payments.create_by.clone(),
            distributor: self.payments.pay_by.clone(),
            payment_sponsor: self.payments.sponsor_by.clone(),
            base_fee: self.fees.base_fee,
            payment_timeout: self.fees.timeout_secs,
            admin_timeout: self.fees.admin_timeout_secs,
        })
    }

    /// Every referenced role must exist, every key must parse and the
    /// numeric settings must make sense
    pub fn validate(&self) -> Result<(AccountDirectory, AssemblerSettings), ConfigError> {
        let directory = self.directory()?;
        let settings = self.settings()?;

        let referenced = [
            ("account.config.create_by", &settings.account_creator),
            ("account.config.sponsor_by", &settings.account_sponsor),
            ("payments.create_by", &settings.issuer),
            ("payments.pay_by", &settings.distributor),
            ("payments.sponsor_by", &settings.payment_sponsor),
        ];
        for (field, role) in referenced {
            if let Some(role) = role {
                if directory.resolve(role).is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "{} names unknown role {}",
                        field, role
                    )));
                }
            }
        }

        if let Some(balance) = &settings.starting_balance {
            match parse_amount(balance) {
                Ok(stroops) if stroops > 0 => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "account.config.starting.balance {} is not a positive amount",
                        balance
                    )))
                }
            }
        }
        if settings.base_fee == 0 {
            return Err(ConfigError::Invalid("fees.base_fee must be positive".to_string()));
        }
        if settings.payment_timeout < 0 || settings.admin_timeout < 0 {
            return Err(ConfigError::Invalid("timeouts cannot be negative".to_string()));
        }

        Ok((directory, settings))
    }

    /// Validate and wire up an assembler against `ledger`
    pub fn build(&self, ledger: Arc<dyn LedgerClient>) -> Result<TransactionAssembler, ConfigError> {
        let (directory, settings) = self.validate()?;
        log::info!(
            "Loaded {} roles for {}",
            directory.len(),
            settings.network
        );
        Ok(TransactionAssembler::new(
            settings,
            Arc::new(directory),
            ledger,
        )?)
    }
}
