use anyhow::Result;
use clap::Parser;
use nummus::cli::Cli;
use nummus::config::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level(), &cli.settings.log_format)?;
    cli.run().await
}
