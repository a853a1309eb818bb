//! CLI command definitions.
//!
//! Each subcommand lives in its own module with an `Args` struct and an
//! `execute` function.

use clap::{Parser, Subcommand};

pub mod shorten;
pub mod synth;

/// CloudCamp - wire cloud app stacks together
#[derive(Parser)]
#[command(name = "camp")]
#[command(version, about = "CloudCamp - wire cloud app stacks together")]
#[command(long_about = r#"
CloudCamp declares an app's stages, databases, services and build steps, and
decides in which form every value produced in one stage reaches its consumers.

COMMANDS:
  synth    → Resolve a manifest and print services and build steps
  shorten  → Shorten an identifier to a provider length limit

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Configuration error
  4 - Synthesis error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synthesize an app manifest
    Synth(synth::SynthArgs),

    /// Shorten an identifier
    Shorten(shorten::ShortenArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_synth_args() {
        let cli = Cli::try_parse_from(["camp", "-v", "synth", "--manifest", "app.yaml", "--format", "yaml"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Synth(_)));
    }

    #[test]
    fn test_parse_shorten_args() {
        let cli = Cli::try_parse_from(["camp", "shorten", "some-id", "--max-length", "16"]).unwrap();
        assert!(matches!(cli.command, Commands::Shorten(_)));
    }

    #[test]
    fn test_reject_unknown_format() {
        assert!(Cli::try_parse_from(["camp", "synth", "--format", "toml"]).is_err());
    }
}
