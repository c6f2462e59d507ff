// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration: all paths canonicalized, all values range
/// checked.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Serve,
    Stat { client: Option<String> },
    Gc { dry_run: bool },
}

/// Parse and validate CLI arguments: clap parse, then security validation
/// of every path and value.
///
/// # Errors
///
/// Returns `ParseError` if any validation fails.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        let validated = SecureArgParser::validate_path(&path.to_string_lossy())?;
        Some(validated)
    } else {
        None
    };

    let command = match cli.command {
        Commands::Serve => ValidatedCommand::Serve,
        Commands::Stat { client } => {
            if let Some(ref c) = client {
                SecureArgParser::validate_argument(c)?;
            }
            ValidatedCommand::Stat { client }
        }
        Commands::Gc { dry_run } => ValidatedCommand::Gc { dry_run },
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_cli_rejects_dangerous_client_filter() {
        let cli = Cli {
            command: Commands::Stat {
                client: Some("../../etc/passwd".to_string()),
            },
            verbose: false,
            config: None,
        };
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn validate_cli_passes_through_serve() {
        let cli = Cli {
            command: Commands::Serve,
            verbose: true,
            config: None,
        };
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::Serve));
        assert!(validated.verbose);
    }

    #[test]
    fn validate_cli_passes_through_gc_dry_run() {
        let cli = Cli {
            command: Commands::Gc { dry_run: true },
            verbose: false,
            config: None,
        };
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::Gc { dry_run: true }));
    }
}
