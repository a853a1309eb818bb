//! CloudCamp CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Configuration error
//! - 4: Synthesis error

use std::process::ExitCode;

use camp_core::CoreError;
use camp_runtime::RuntimeError;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod manifest;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CONFIG_ERROR: u8 = 3;
    pub const SYNTH_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(ExitCodes::INVALID_ARGS)
            } else {
                ExitCode::from(ExitCodes::SUCCESS)
            };
        }
    };

    init_logging(cli.verbose, cli.json_logs);

    let result = match cli.command {
        Commands::Synth(args) => commands::synth::execute(args),
        Commands::Shorten(args) => commands::shorten::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "camp=debug,warn" } else { "camp=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    let log_result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(core) = cause.downcast_ref::<CoreError>() {
            return match core {
                CoreError::MissingContext(_) | CoreError::InvalidConfig(_) => ExitCodes::CONFIG_ERROR,
                CoreError::Io(_) | CoreError::Json(_) => ExitCodes::GENERAL_ERROR,
                _ => ExitCodes::SYNTH_ERROR,
            };
        }
        if let Some(runtime) = cause.downcast_ref::<RuntimeError>() {
            return match runtime {
                RuntimeError::UnsupportedOs(_)
                | RuntimeError::UnsupportedEngine(_)
                | RuntimeError::UnsupportedCapacity(_) => ExitCodes::CONFIG_ERROR,
                RuntimeError::Core(CoreError::MissingContext(_) | CoreError::InvalidConfig(_)) => {
                    ExitCodes::CONFIG_ERROR
                }
                _ => ExitCodes::SYNTH_ERROR,
            };
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_error() {
        let config: anyhow::Error = CoreError::MissingContext("@cloudcamp/vpc".to_string()).into();
        assert_eq!(categorize_error(&config), ExitCodes::CONFIG_ERROR);

        let os: anyhow::Error = RuntimeError::UnsupportedOs("beos".to_string()).into();
        assert_eq!(categorize_error(&os.context("Failed to add pre step")), ExitCodes::CONFIG_ERROR);

        let synth: anyhow::Error = RuntimeError::UnknownVariable("a/b.c".to_string()).into();
        assert_eq!(categorize_error(&synth), ExitCodes::SYNTH_ERROR);

        assert_eq!(categorize_error(&anyhow::anyhow!("boom")), ExitCodes::GENERAL_ERROR);
    }
}
