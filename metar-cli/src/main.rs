//! Binary crate for the `metar` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration and report composition
//! - Human-friendly output formatting

use clap::Parser;

mod cli;
mod compose;

fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cli::setup_logging(cmd.verbose);
    cmd.run()
}
