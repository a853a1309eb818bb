//! Shorten command - Print an identifier shortened to a length limit.

use anyhow::Result;
use clap::Args;
use tracing::debug;

use camp_core::shorten;

#[derive(Args)]
pub struct ShortenArgs {
    /// Identifier to shorten
    id: String,

    /// Maximum length of the result
    #[arg(short = 'n', long, default_value_t = 255)]
    max_length: usize,
}

pub fn execute(args: ShortenArgs) -> Result<()> {
    let short = shorten(&args.id, args.max_length);
    debug!("Shortened {} to {}", args.id, short);
    println!("{}", short);
    Ok(())
}
