use anyhow::Result;
use clap::CommandFactory;

use crate::cli::Cli;

/// Same text as `--help`
pub fn run() -> Result<()> {
    Cli::command().print_help()?;
    println!();
    Ok(())
}
