//! Migration Runner - Orders and applies pending migrations
//!
//! Applies pending migrations in ascending identifier order against a schema
//! engine, recording completion in the history store so repeated runs are
//! idempotent. Concurrent runs against one target schema must be serialized by
//! the caller (an advisory lock owned by the history store's database).

use std::collections::HashSet;

use crate::definitions::{Migration, MigrationRunResult, MigrationStatus};
use crate::engine::SchemaEngine;
use crate::error::{MigrationError, MigrationResult};
use crate::history::MigrationHistory;

/// Pending migrations in apply order
///
/// Returns migrations whose id is not in `applied_ids`, sorted ascending by
/// id. Duplicate ids anywhere in `migrations` are rejected.
pub fn plan<'a>(
    migrations: &'a [Migration],
    applied_ids: &HashSet<String>,
) -> MigrationResult<Vec<&'a Migration>> {
    let mut seen = HashSet::new();
    for migration in migrations {
        if !seen.insert(migration.id.as_str()) {
            return Err(MigrationError::DuplicateId(migration.id.clone()));
        }
    }

    let mut pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !applied_ids.contains(&m.id))
        .collect();
    pending.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(pending)
}

/// Migration runner that executes migrations through a schema engine
pub struct MigrationRunner<E, H> {
    engine: E,
    history: H,
}

impl<E: SchemaEngine, H: MigrationHistory> MigrationRunner<E, H> {
    pub fn new(engine: E, history: H) -> Self {
        Self { engine, history }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut E, &mut H) {
        (&mut self.engine, &mut self.history)
    }

    /// Run all pending migrations, assigning them one new batch number
    pub async fn run(&mut self, migrations: &[Migration]) -> MigrationResult<MigrationRunResult> {
        let start_time = std::time::Instant::now();

        self.history.ensure_ready().await?;

        let applied_ids: HashSet<String> = self
            .history
            .applied()
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        let pending = plan(migrations, &applied_ids)?;

        if pending.is_empty() {
            return Ok(MigrationRunResult {
                applied_count: 0,
                applied_migrations: Vec::new(),
                skipped_count: applied_ids.len(),
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        let next_batch = self.history.latest_batch().await? + 1;

        let mut applied_migrations = Vec::new();
        for migration in pending {
            tracing::info!(id = %migration.id, name = %migration.name, "applying migration");
            self.apply(migration, next_batch).await?;
            applied_migrations.push(migration.id.clone());
        }

        Ok(MigrationRunResult {
            applied_count: applied_migrations.len(),
            applied_migrations,
            skipped_count: applied_ids.len(),
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Apply a single migration
    ///
    /// Every operation runs in authored order; the history record is written
    /// strictly after all of them succeed. A rejected operation aborts the
    /// rest of the migration and leaves it unrecorded, so the whole record is
    /// retried from its first operation on the next run.
    pub async fn apply(&mut self, migration: &Migration, batch: i32) -> MigrationResult<()> {
        for operation in migration.up_operations() {
            tracing::debug!(id = %migration.id, %operation, "applying operation");
            self.engine.apply(operation).await?;
        }
        self.history.record(&migration.id, batch).await
    }

    /// Apply one migration by id, failing if it is unknown or already applied
    pub async fn run_migration(
        &mut self,
        migrations: &[Migration],
        id: &str,
    ) -> MigrationResult<()> {
        self.history.ensure_ready().await?;

        let migration = migrations
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| MigrationError::UnknownMigration(id.to_string()))?;

        let already_applied = self
            .history
            .applied()
            .await?
            .iter()
            .any(|record| record.id == id);
        if already_applied {
            return Err(MigrationError::History(format!(
                "migration {} is already applied",
                id
            )));
        }

        let next_batch = self.history.latest_batch().await? + 1;
        self.apply(migration, next_batch).await
    }

    /// Every known migration paired with its status, in apply order
    pub async fn status(
        &mut self,
        migrations: &[Migration],
    ) -> MigrationResult<Vec<(Migration, MigrationStatus)>> {
        self.history.ensure_ready().await?;

        let applied = self.history.applied().await?;

        let mut ordered: Vec<Migration> = migrations.to_vec();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let mut statuses = Vec::with_capacity(ordered.len());
        for migration in ordered {
            let status = applied
                .iter()
                .find(|record| record.id == migration.id)
                .map(|record| MigrationStatus::Applied {
                    applied_at: record.applied_at,
                    batch: record.batch,
                })
                .unwrap_or(MigrationStatus::Pending);
            statuses.push((migration, status));
        }
        Ok(statuses)
    }
}
