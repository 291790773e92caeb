//! Account directory
//!
//! Static role → account lookup built once from configuration.

pub mod directory;

pub use directory::{Account, AccountDefinition, AccountDirectory, DirectoryError};
