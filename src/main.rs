use anyhow::Result;
use clap::Parser;
use labctl::cli::Cli;
use labctl::config::Environment;
use labctl::{commands, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let env = Environment::from_process();
    commands::run(cli, &env, std::io::stdout()).await?;
    Ok(())
}
