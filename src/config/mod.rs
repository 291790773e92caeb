//! Engine configuration loading and validation

pub mod settings;

pub use settings::{
    AccountCreation, AccountEntry, AccountSection, ConfigError, EngineConfig, FeesSection,
    PaymentsSection, StartingSection, TrustlineEntry,
};
