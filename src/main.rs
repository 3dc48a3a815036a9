use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ngxdash::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ngxdash=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Env { format } => cli::commands::env(format).await,
        Commands::Sites { format } => cli::commands::sites(format).await,
        Commands::Enable { name } => cli::commands::enable(&name).await,
        Commands::Disable { name } => cli::commands::disable(&name).await,
        Commands::Test => cli::commands::test().await,
        Commands::Reload => cli::commands::reload().await,
        Commands::Create(args) => cli::commands::create(args).await,
        Commands::Logs {
            tail,
            errors,
            format,
        } => cli::commands::logs(tail, errors, format).await,
        Commands::Stats { format } => cli::commands::stats(format).await,
        Commands::Metrics {
            samples,
            interval,
            format,
        } => cli::commands::metrics(samples, interval, format).await,
        Commands::System { format } => cli::commands::system(format).await,
    }
}
