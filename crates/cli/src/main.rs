mod commands;
mod migrations;

use clap::{Parser, Subcommand};
use commands::*;

#[derive(Parser)]
#[command(name = "stratum")]
#[command(about = "Schema migration tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration management
    Migrate {
        #[command(subcommand)]
        migrate_command: MigrateCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { migrate_command } => migrate::execute(migrate_command).await,
    }
}
