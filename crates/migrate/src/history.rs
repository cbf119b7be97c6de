//! Migration History - Tracks which migrations have been applied
//!
//! The history store is consulted to compute the pending plan and written to
//! strictly after every operation in a migration succeeds, so a crash mid-apply
//! is always retryable from the start of that migration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MigrationResult;

/// A row in the migration-history store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedMigration {
    pub id: String,
    pub applied_at: DateTime<Utc>,
    /// Batch number grouping migrations applied in the same run
    pub batch: i32,
}

/// Persistent record of applied migrations
#[async_trait]
pub trait MigrationHistory: Send {
    /// Prepare the store (e.g. create the tracking table)
    async fn ensure_ready(&mut self) -> MigrationResult<()>;

    /// All applied migrations
    async fn applied(&self) -> MigrationResult<Vec<AppliedMigration>>;

    /// Record a migration as applied
    async fn record(&mut self, id: &str, batch: i32) -> MigrationResult<()>;

    /// Remove a migration record (rollback)
    async fn remove(&mut self, id: &str) -> MigrationResult<()>;

    /// Highest batch number recorded, 0 when empty
    async fn latest_batch(&self) -> MigrationResult<i32>;
}

/// History store kept in memory, for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    rows: Vec<AppliedMigration>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MigrationHistory for MemoryHistory {
    async fn ensure_ready(&mut self) -> MigrationResult<()> {
        Ok(())
    }

    async fn applied(&self) -> MigrationResult<Vec<AppliedMigration>> {
        Ok(self.rows.clone())
    }

    async fn record(&mut self, id: &str, batch: i32) -> MigrationResult<()> {
        self.rows.push(AppliedMigration {
            id: id.to_string(),
            applied_at: Utc::now(),
            batch,
        });
        Ok(())
    }

    async fn remove(&mut self, id: &str) -> MigrationResult<()> {
        self.rows.retain(|row| row.id != id);
        Ok(())
    }

    async fn latest_batch(&self) -> MigrationResult<i32> {
        Ok(self.rows.iter().map(|row| row.batch).max().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_history_round_trip() {
        let mut history = MemoryHistory::new();
        history.ensure_ready().await.unwrap();
        assert_eq!(history.latest_batch().await.unwrap(), 0);

        history.record("20230516102147", 1).await.unwrap();
        history.record("20230516114831", 1).await.unwrap();
        history.record("20230618142459", 2).await.unwrap();

        assert_eq!(history.latest_batch().await.unwrap(), 2);
        assert_eq!(history.applied().await.unwrap().len(), 3);

        history.remove("20230618142459").await.unwrap();
        assert_eq!(history.latest_batch().await.unwrap(), 1);
    }
}
