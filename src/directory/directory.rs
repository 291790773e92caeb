//! Role-keyed account table
//!
//! Accounts may name other accounts as co-signers. Those references are
//! resolved to indices once at construction; after that the table is
//! read-only and can be shared across tasks without locking.

use crate::crypto::{is_valid_account_id, KeyPair};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while building or querying the directory
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("Duplicate role: {0}")]
    DuplicateRole(String),
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("Role {role} names unknown co-signer role {co_signer}")]
    UnknownCoSigner { role: String, co_signer: String },
    #[error("Role {0} has neither a public key nor a secret")]
    MissingKey(String),
    #[error("Role {0} has an invalid secret")]
    InvalidSecret(String),
    #[error("Role {0} has an invalid public key")]
    InvalidPublicKey(String),
    #[error("Role {0}: public key does not match secret")]
    KeyMismatch(String),
}

/// Static description of one account, as read from configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountDefinition {
    pub role: String,
    /// Derived from `secret` when absent
    pub public_key: Option<String>,
    pub secret: Option<String>,
    pub co_signer_roles: Vec<String>,
}

impl AccountDefinition {
    pub fn new(role: &str) -> Self {
        Self {
            role: role.to_string(),
            ..Default::default()
        }
    }

    pub fn with_public_key(mut self, public_key: &str) -> Self {
        self.public_key = Some(public_key.to_string());
        self
    }

    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.to_string());
        self
    }

    pub fn with_co_signer(mut self, role: &str) -> Self {
        self.co_signer_roles.push(role.to_string());
        self
    }
}

/// A tracked account
#[derive(Debug, Clone)]
pub struct Account {
    role: String,
    public_key: String,
    keypair: Option<KeyPair>,
    co_signer_roles: Vec<String>,
    co_signers: Vec<usize>,
}

impl Account {
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Present only for accounts whose secret this process holds
    pub fn keypair(&self) -> Option<&KeyPair> {
        self.keypair.as_ref()
    }

    pub fn has_secret(&self) -> bool {
        self.keypair.is_some()
    }

    pub fn co_signer_roles(&self) -> &[String] {
        &self.co_signer_roles
    }
}

/// Flat role table with resolved co-signer references
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: Vec<Account>,
    by_role: HashMap<String, usize>,
    by_public_key: HashMap<String, usize>,
}

impl AccountDirectory {
    /// Build the table; every co-signer role must resolve
    pub fn new(definitions: Vec<AccountDefinition>) -> Result<Self, DirectoryError> {
        let mut accounts = Vec::with_capacity(definitions.len());
        let mut by_role = HashMap::new();
        let mut by_public_key = HashMap::new();

        for def in &definitions {
            if by_role.contains_key(&def.role) {
                return Err(DirectoryError::DuplicateRole(def.role.clone()));
            }

            let keypair = match &def.secret {
                Some(secret) => Some(
                    KeyPair::from_secret(secret)
                        .map_err(|_| DirectoryError::InvalidSecret(def.role.clone()))?,
                ),
                None => None,
            };

            let public_key = match (&def.public_key, &keypair) {
                (Some(public), Some(kp)) if public != &kp.account_id() => {
                    return Err(DirectoryError::KeyMismatch(def.role.clone()));
                }
                (Some(public), _) => {
                    if !is_valid_account_id(public) {
                        return Err(DirectoryError::InvalidPublicKey(def.role.clone()));
                    }
                    public.clone()
                }
                (None, Some(kp)) => kp.account_id(),
                (None, None) => return Err(DirectoryError::MissingKey(def.role.clone())),
            };

            let index = accounts.len();
            by_role.insert(def.role.clone(), index);
            // First role wins when two roles share a key
            by_public_key.entry(public_key.clone()).or_insert(index);
            accounts.push(Account {
                role: def.role.clone(),
                public_key,
                keypair,
                co_signer_roles: def.co_signer_roles.clone(),
                co_signers: Vec::new(),
            });
        }

        for account in accounts.iter_mut() {
            let mut resolved = Vec::with_capacity(account.co_signer_roles.len());
            for co_signer in &account.co_signer_roles {
                let index =
                    by_role
                        .get(co_signer)
                        .copied()
                        .ok_or_else(|| DirectoryError::UnknownCoSigner {
                            role: account.role.clone(),
                            co_signer: co_signer.clone(),
                        })?;
                if !resolved.contains(&index) {
                    resolved.push(index);
                }
            }
            account.co_signers = resolved;
        }

        log::debug!("Account directory loaded with {} roles", accounts.len());

        Ok(Self {
            accounts,
            by_role,
            by_public_key,
        })
    }

    /// Look up a role
    pub fn resolve(&self, role: &str) -> Option<&Account> {
        self.by_role.get(role).map(|&i| &self.accounts[i])
    }

    /// Look up a role that must exist
    pub fn require(&self, role: &str) -> Result<&Account, DirectoryError> {
        self.resolve(role)
            .ok_or_else(|| DirectoryError::UnknownRole(role.to_string()))
    }

    /// Look up a role that must exist and whose secret must be held
    pub fn require_signer(&self, role: &str) -> Result<&KeyPair, DirectoryError> {
        self.require(role)?
            .keypair()
            .ok_or_else(|| DirectoryError::InvalidSecret(role.to_string()))
    }

    pub fn find_by_public_key(&self, public_key: &str) -> Option<&Account> {
        self.by_public_key
            .get(public_key)
            .map(|&i| &self.accounts[i])
    }

    /// Resolved co-signers of an account, in declaration order
    pub fn co_signers<'a>(&'a self, account: &'a Account) -> impl Iterator<Item = &'a Account> {
        account.co_signers.iter().map(move |&i| &self.accounts[i])
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
