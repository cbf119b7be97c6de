//! Postgres backends for the schema engine and history store

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::definitions::MigrationConfig;
use crate::engine::SchemaEngine;
use crate::error::{MigrationError, MigrationResult};
use crate::history::{AppliedMigration, MigrationHistory};
use crate::operations::SchemaOperation;

/// Schema engine that renders operations to DDL and executes them on Postgres
pub struct PostgresEngine {
    pool: PgPool,
}

impl PostgresEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect from a database URL
    pub async fn from_url(database_url: &str) -> MigrationResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SchemaEngine for PostgresEngine {
    async fn apply(&mut self, operation: &SchemaOperation) -> MigrationResult<()> {
        for statement in operation.to_sql() {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| MigrationError::OperationFailed {
                    operation: operation.clone(),
                    cause: e.to_string(),
                })?;
        }
        Ok(())
    }
}

/// History store backed by a tracking table
pub struct PostgresHistory {
    pool: PgPool,
    config: MigrationConfig,
}

impl PostgresHistory {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, MigrationConfig::default())
    }

    pub fn with_config(pool: PgPool, config: MigrationConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn history_error(context: &str, e: sqlx::Error) -> MigrationError {
        MigrationError::History(format!("{}: {}", context, e))
    }
}

#[async_trait]
impl MigrationHistory for PostgresHistory {
    async fn ensure_ready(&mut self) -> MigrationResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id VARCHAR(255) PRIMARY KEY,\n    \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,\n    \
                batch INTEGER NOT NULL\n\
            );",
            self.config.history_table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::history_error("failed to create history table", e))?;
        Ok(())
    }

    async fn applied(&self) -> MigrationResult<Vec<AppliedMigration>> {
        let sql = format!(
            "SELECT id, applied_at, batch FROM {} ORDER BY id ASC",
            self.config.history_table
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::history_error("failed to query applied migrations", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| Self::history_error("failed to read id", e))?;
            let applied_at: chrono::DateTime<chrono::Utc> = row
                .try_get("applied_at")
                .map_err(|e| Self::history_error("failed to read applied_at", e))?;
            let batch: i32 = row
                .try_get("batch")
                .map_err(|e| Self::history_error("failed to read batch", e))?;
            records.push(AppliedMigration {
                id,
                applied_at,
                batch,
            });
        }
        Ok(records)
    }

    async fn record(&mut self, id: &str, batch: i32) -> MigrationResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, batch) VALUES ($1, $2)",
            self.config.history_table
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(batch)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::history_error("failed to record migration", e))?;
        Ok(())
    }

    async fn remove(&mut self, id: &str) -> MigrationResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.config.history_table);
        sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::history_error("failed to remove migration record", e))?;
        Ok(())
    }

    async fn latest_batch(&self) -> MigrationResult<i32> {
        let sql = format!(
            "SELECT COALESCE(MAX(batch), 0) FROM {}",
            self.config.history_table
        );
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::history_error("failed to get latest batch", e))?;
        let latest: i32 = row
            .try_get(0)
            .map_err(|e| Self::history_error("failed to read latest batch", e))?;
        Ok(latest)
    }
}
