//! snipbook CLI: compile snippet corpora into books.
//!
//! Reads a book directory of chapter directories full of packed
//! `Title`/`Id`/`Score`/`Body` entries and writes one ordered,
//! deduplicated document per book.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
