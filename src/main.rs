mod ai;
mod app;
mod classify;
mod cli;
mod config;
mod domain;
mod infrastructure;
mod news;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use infrastructure::{directories, logging};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();

    let config = config::load_config()?;
    let paths = directories::resolve_paths(&config)?;
    logging::init_tracing(&config, &paths)?;

    let app = app::EcoSortifyApp::initialize(config, paths)?;
    app.run(cli.command).await
}
