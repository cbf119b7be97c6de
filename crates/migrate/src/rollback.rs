//! Migration Rollback - Reverts applied migrations
//!
//! Rolls back migrations by batch or individually, executing inverse
//! operations in reverse order. A migration with no explicit down and at least
//! one non-invertible operation fails with `Irreversible` before any schema
//! change is attempted.

use async_trait::async_trait;

use crate::definitions::{Migration, RollbackResult};
use crate::engine::SchemaEngine;
use crate::error::{MigrationError, MigrationResult};
use crate::history::MigrationHistory;
use crate::runner::MigrationRunner;

/// Extension trait adding rollback to `MigrationRunner`
#[async_trait]
pub trait MigrationRollback {
    /// Roll back the last batch of migrations
    async fn rollback_last_batch(
        &mut self,
        migrations: &[Migration],
    ) -> MigrationResult<RollbackResult>;

    /// Roll back all migrations in a specific batch
    async fn rollback_batch(
        &mut self,
        migrations: &[Migration],
        batch: i32,
    ) -> MigrationResult<RollbackResult>;

    /// Roll back a single migration
    async fn rollback_migration(&mut self, migration: &Migration) -> MigrationResult<()>;

    /// Roll back every applied migration
    async fn rollback_all(&mut self, migrations: &[Migration])
        -> MigrationResult<RollbackResult>;
}

#[async_trait]
impl<E, H> MigrationRollback for MigrationRunner<E, H>
where
    E: SchemaEngine,
    H: MigrationHistory,
{
    async fn rollback_last_batch(
        &mut self,
        migrations: &[Migration],
    ) -> MigrationResult<RollbackResult> {
        let latest_batch = self.history().latest_batch().await?;
        if latest_batch == 0 {
            return Ok(RollbackResult {
                rolled_back_count: 0,
                rolled_back_migrations: Vec::new(),
                execution_time_ms: 0,
            });
        }
        self.rollback_batch(migrations, latest_batch).await
    }

    async fn rollback_batch(
        &mut self,
        migrations: &[Migration],
        batch: i32,
    ) -> MigrationResult<RollbackResult> {
        let start_time = std::time::Instant::now();

        let mut batch_records: Vec<_> = self
            .history()
            .applied()
            .await?
            .into_iter()
            .filter(|record| record.batch == batch)
            .collect();

        // Undo in reverse apply order
        batch_records.sort_by(|a, b| b.id.cmp(&a.id));

        let mut rolled_back_migrations = Vec::new();
        for record in batch_records {
            let migration = migrations
                .iter()
                .find(|m| m.id == record.id)
                .ok_or_else(|| MigrationError::UnknownMigration(record.id.clone()))?;

            tracing::info!(id = %migration.id, name = %migration.name, "rolling back migration");
            self.rollback_migration(migration).await?;
            rolled_back_migrations.push(record.id);
        }

        Ok(RollbackResult {
            rolled_back_count: rolled_back_migrations.len(),
            rolled_back_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    async fn rollback_migration(&mut self, migration: &Migration) -> MigrationResult<()> {
        // Resolve the full down before touching the schema
        let down = migration.down_operations()?;

        let (engine, history) = self.parts_mut();
        for operation in &down {
            tracing::debug!(id = %migration.id, %operation, "reverting operation");
            engine.apply(operation).await?;
        }
        history.remove(&migration.id).await
    }

    async fn rollback_all(
        &mut self,
        migrations: &[Migration],
    ) -> MigrationResult<RollbackResult> {
        let start_time = std::time::Instant::now();
        let mut rolled_back_migrations = Vec::new();

        loop {
            let latest_batch = self.history().latest_batch().await?;
            if latest_batch == 0 {
                break;
            }
            let result = self.rollback_batch(migrations, latest_batch).await?;
            rolled_back_migrations.extend(result.rolled_back_migrations);
        }

        Ok(RollbackResult {
            rolled_back_count: rolled_back_migrations.len(),
            rolled_back_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}
