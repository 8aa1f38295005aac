use anyhow::Result;
use clap::{Parser, Subcommand};
use perch_backend::api;
use perch_backend::bootstrap;
use perch_backend::config::PerchConfig;
use perch_backend::telemetry;

#[derive(Parser)]
#[command(author, version, about = "Perch social feed backend daemon")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = PerchConfig::from_env()?;
    let resources = bootstrap::initialize(&config).await?;
    tracing::info!(
        database_initialized = resources.database_initialized,
        directories_created = resources.directories_created.len(),
        "bootstrap complete"
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => api::serve_http(config, resources.database).await,
    }
}
