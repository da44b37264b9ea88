//! CourseAtlas CLI — university course directory crawler.
//!
//! Walks a public course catalog (year → semester → subject → course),
//! extracts structured facts from each description with an LLM, and writes
//! a flat-file course directory.

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
