//! chatmark CLI: render generated chat answers to structured HTML.
//!
//! Reads markdown from a file or stdin and prints the rendered HTML, the full
//! processing result as JSON, or the normalized markdown.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
