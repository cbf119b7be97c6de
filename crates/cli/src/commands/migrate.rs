use anyhow::Context;
use clap::Subcommand;
use sqlx::PgPool;
use stratum_migrate::{
    MigrationRollback, MigrationRunner, MigrationStatus, PostgresEngine, PostgresHistory,
};

use crate::migrations;

#[derive(Subcommand)]
pub enum MigrateCommands {
    /// Apply all pending migrations
    Run {
        /// Postgres connection string (falls back to DATABASE_URL)
        #[arg(long)]
        database_url: Option<String>,
    },

    /// Roll back the most recent batch, or a specific one
    Rollback {
        #[arg(long)]
        database_url: Option<String>,

        /// Batch number to roll back
        #[arg(long)]
        batch: Option<i32>,
    },

    /// Show applied and pending migrations
    Status {
        #[arg(long)]
        database_url: Option<String>,
    },
}

pub async fn execute(command: MigrateCommands) -> anyhow::Result<()> {
    match command {
        MigrateCommands::Run { database_url } => run(database_url).await,
        MigrateCommands::Rollback {
            database_url,
            batch,
        } => rollback(database_url, batch).await,
        MigrateCommands::Status { database_url } => status(database_url).await,
    }
}

fn resolve_database_url(flag: Option<String>) -> anyhow::Result<String> {
    match flag {
        Some(url) => Ok(url),
        None => std::env::var("DATABASE_URL")
            .context("no database given; pass --database-url or set DATABASE_URL"),
    }
}

async fn runner_for(
    database_url: Option<String>,
) -> anyhow::Result<MigrationRunner<PostgresEngine, PostgresHistory>> {
    let url = resolve_database_url(database_url)?;
    let pool = PgPool::connect(&url)
        .await
        .context("failed to connect to database")?;
    Ok(MigrationRunner::new(
        PostgresEngine::new(pool.clone()),
        PostgresHistory::new(pool),
    ))
}

async fn run(database_url: Option<String>) -> anyhow::Result<()> {
    let mut runner = runner_for(database_url).await?;
    let result = runner.run(&migrations::all()).await?;

    if result.applied_count == 0 {
        println!(
            "Nothing to migrate ({} already applied)",
            result.skipped_count
        );
        return Ok(());
    }

    for id in &result.applied_migrations {
        println!("  ✅ {}", id);
    }
    println!(
        "Applied {} migration(s) in {}ms",
        result.applied_count, result.execution_time_ms
    );
    Ok(())
}

async fn rollback(database_url: Option<String>, batch: Option<i32>) -> anyhow::Result<()> {
    let mut runner = runner_for(database_url).await?;
    let migrations = migrations::all();

    let result = match batch {
        Some(batch) => runner.rollback_batch(&migrations, batch).await?,
        None => runner.rollback_last_batch(&migrations).await?,
    };

    if result.rolled_back_count == 0 {
        println!("Nothing to roll back");
        return Ok(());
    }

    for id in &result.rolled_back_migrations {
        println!("  ↩️  {}", id);
    }
    println!(
        "Rolled back {} migration(s) in {}ms",
        result.rolled_back_count, result.execution_time_ms
    );
    Ok(())
}

async fn status(database_url: Option<String>) -> anyhow::Result<()> {
    let mut runner = runner_for(database_url).await?;
    let statuses = runner.status(&migrations::all()).await?;

    println!("Migration Status:");
    println!("================");

    for (migration, status) in statuses {
        match status {
            MigrationStatus::Applied { applied_at, batch } => println!(
                "  ✅ {} {} (batch {}, applied {})",
                migration.id,
                migration.name,
                batch,
                applied_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            MigrationStatus::Pending => {
                println!("  ⏳ {} {}", migration.id, migration.name)
            }
        }
    }
    Ok(())
}
