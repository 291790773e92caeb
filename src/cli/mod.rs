//! Command handlers for the `assembler` binary

pub mod commands;

pub use commands::{cmd_check_config, cmd_keygen, cmd_memo, cmd_sandbox, CliResult};
