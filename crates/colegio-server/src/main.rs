//! Colegio: operator entry point.
//!
//! Runs schema migrations, session maintenance, the geographic data
//! import and cafeteria interval administration.
//!
//! ```bash
//! colegio migrate
//! colegio clear-institution --user 6f1c…
//! colegio clear-sessions --all
//! colegio cleanup-sessions
//! colegio import-geo --out data/ubicaciones.csv
//! colegio meal-interval --institution 2b7e… --minutes 120
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("colegio=info".parse()?))
        .json()
        .init();

    let cli = Cli::parse();
    commands::run(cli).await
}
