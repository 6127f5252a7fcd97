//! wavegate CLI entrypoint

use anyhow::Result;
use clap::Parser;

use wavegate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // File logging is configured by the start command once the config is
    // loaded; other commands report to the console.
    let cli = Cli::parse();
    cli.execute().await
}
