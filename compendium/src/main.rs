//! Compendium CLI - fetch monsters and search results from the D&D Insider
//! Compendium without a browser.
//!
//! The session is kept on disk between runs, so you only log in when the
//! cookies run out.

mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    execute(cli).await
}
