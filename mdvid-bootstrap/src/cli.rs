// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
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

/// Validated CLI configuration.
///
/// Holds all CLI arguments after security validation. Path arguments that
/// must already exist have been canonicalized; paths that may not exist yet
/// (workspace roots, output directories) are validated for dangerous
/// patterns only.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub workers: Option<usize>,
}

/// Validated command variants, one per CLI subcommand.
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Create { input: PathBuf, style: String },
    Run { job_id: String },
    Resume { job_id: String },
    Status { job_id: String },
    List { status: Option<String> },
    Cancel { job_id: String },
    Delete { job_id: String, force: bool },
}

/// Parse and validate CLI arguments in one step.
///
/// # Errors
///
/// Returns `ParseError` if any argument fails security or range validation.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_job_id(job_id: &str) -> Result<String, ParseError> {
    SecureArgParser::validate_argument(job_id)?;
    if job_id.is_empty() {
        return Err(ParseError::InvalidValue {
            arg: "job-id".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(job_id.to_string())
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        Some(SecureArgParser::validate_path(&path.to_string_lossy())?)
    } else {
        None
    };

    if let Some(workers) = cli.workers {
        if workers == 0 || workers > 256 {
            return Err(ParseError::InvalidValue {
                arg: "workers".to_string(),
                reason: "must be between 1 and 256".to_string(),
            });
        }
    }

    let command = match cli.command {
        Commands::Create { input, style } => {
            let validated_input = SecureArgParser::validate_path(&input.to_string_lossy())?;
            SecureArgParser::validate_argument(&style)?;
            ValidatedCommand::Create {
                input: validated_input,
                style,
            }
        }
        Commands::Run { job_id } => ValidatedCommand::Run {
            job_id: validate_job_id(&job_id)?,
        },
        Commands::Resume { job_id } => ValidatedCommand::Resume {
            job_id: validate_job_id(&job_id)?,
        },
        Commands::Status { job_id } => ValidatedCommand::Status {
            job_id: validate_job_id(&job_id)?,
        },
        Commands::List { status } => {
            if let Some(ref s) = status {
                SecureArgParser::validate_argument(s)?;
            }
            ValidatedCommand::List { status }
        }
        Commands::Cancel { job_id } => ValidatedCommand::Cancel {
            job_id: validate_job_id(&job_id)?,
        },
        Commands::Delete { job_id, force } => ValidatedCommand::Delete {
            job_id: validate_job_id(&job_id)?,
            force,
        },
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        workers: cli.workers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_workers() {
        let cli = Cli {
            command: Commands::List { status: None },
            verbose: false,
            config: None,
            workers: Some(0),
        };
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn accepts_list_with_no_filter() {
        let cli = Cli {
            command: Commands::List { status: None },
            verbose: false,
            config: None,
            workers: None,
        };
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::List { status: None }));
    }

    #[test]
    fn rejects_dangerous_job_id() {
        let cli = Cli {
            command: Commands::Status {
                job_id: "../../etc/passwd".to_string(),
            },
            verbose: false,
            config: None,
            workers: None,
        };
        assert!(validate_cli(cli).is_err());
    }
}
