//! Migration Definitions - Core types for the migration system
//!
//! A `Migration` pairs a timestamp-derived identifier with an ordered list of
//! schema operations. Identifier ordering across all known migrations defines
//! the global apply order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, MigrationResult};
use crate::operations::SchemaOperation;
use crate::schema::Schema;

/// A versioned, ordered schema change unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    /// Unique identifier, typically a timestamp like `20230516102147`
    pub id: String,
    /// Human-readable name
    pub name: String,
    up: Vec<SchemaOperation>,
    /// Explicit rollback operations; when absent the down is derived by
    /// inverting `up` in reverse order
    down: Option<Vec<SchemaOperation>>,
}

impl Migration {
    /// Define a migration whose rollback is derived from its forward
    /// operations, like a Rails `change` block
    pub fn change<F>(id: &str, name: &str, callback: F) -> Self
    where
        F: FnOnce(&mut Schema),
    {
        let mut schema = Schema::new();
        callback(&mut schema);

        Self {
            id: id.to_string(),
            name: name.to_string(),
            up: schema.into_operations(),
            down: None,
        }
    }

    /// Define a migration with explicit up and down blocks, required when the
    /// forward operations are destructive
    pub fn up_down<U, D>(id: &str, name: &str, up: U, down: D) -> Self
    where
        U: FnOnce(&mut Schema),
        D: FnOnce(&mut Schema),
    {
        let mut up_schema = Schema::new();
        up(&mut up_schema);
        let mut down_schema = Schema::new();
        down(&mut down_schema);

        Self {
            id: id.to_string(),
            name: name.to_string(),
            up: up_schema.into_operations(),
            down: Some(down_schema.into_operations()),
        }
    }

    /// Forward operations in authored order
    pub fn up_operations(&self) -> &[SchemaOperation] {
        &self.up
    }

    /// Rollback operations: the explicit down if present, otherwise the
    /// inverse of each forward operation in reverse order
    pub fn down_operations(&self) -> MigrationResult<Vec<SchemaOperation>> {
        if let Some(down) = &self.down {
            return Ok(down.clone());
        }

        let mut inverted = Vec::with_capacity(self.up.len());
        for op in self.up.iter().rev() {
            match op.inverse() {
                Some(inverse) => inverted.push(inverse),
                None => {
                    return Err(MigrationError::Irreversible {
                        id: self.id.clone(),
                        operation: op.to_string(),
                    })
                }
            }
        }
        Ok(inverted)
    }

    /// Whether a rollback is defined or derivable
    pub fn is_reversible(&self) -> bool {
        self.down.is_some() || self.up.iter().all(|op| op.inverse().is_some())
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Table name for tracking applied migrations
    pub history_table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            history_table: "stratum_migrations".to_string(),
        }
    }
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Not yet applied
    Pending,
    /// Recorded in the history store
    Applied {
        applied_at: DateTime<Utc>,
        batch: i32,
    },
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// IDs of migrations that were applied
    pub applied_migrations: Vec<String>,
    /// Number of migrations that were skipped (already applied)
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of rolling back migrations
#[derive(Debug)]
pub struct RollbackResult {
    /// Number of migrations that were rolled back
    pub rolled_back_count: usize,
    /// IDs of migrations that were rolled back
    pub rolled_back_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::ColumnChanges;

    #[test]
    fn test_change_migration_derives_down_in_reverse_order() {
        let migration = Migration::change("20230516102147", "create dummies", |schema| {
            schema.create_table("dummies", |t| {
                t.id("id");
                t.string("name");
            });
            schema.add_index("dummies", "name", false);
        });

        assert!(migration.is_reversible());
        let down = migration.down_operations().unwrap();
        assert_eq!(down.len(), 2);
        assert!(matches!(&down[0], SchemaOperation::DropIndex { .. }));
        assert!(matches!(
            &down[1],
            SchemaOperation::DropTable { name } if name == "dummies"
        ));
    }

    #[test]
    fn test_destructive_change_without_down_is_irreversible() {
        let migration = Migration::change("20230619064021", "change products", |schema| {
            schema.change_table("products", |t| {
                t.remove("name");
            });
        });

        assert!(!migration.is_reversible());
        let err = migration.down_operations().unwrap_err();
        assert!(matches!(err, MigrationError::Irreversible { id, .. } if id == "20230619064021"));
    }

    #[test]
    fn test_explicit_down_wins_over_derivation() {
        let migration = Migration::up_down(
            "20230701000000",
            "tighten price",
            |schema| {
                schema.change_column(
                    "products",
                    "price",
                    ColumnChanges::new().set_nullable(false),
                );
            },
            |schema| {
                schema.change_column(
                    "products",
                    "price",
                    ColumnChanges::new().set_nullable(true),
                );
            },
        );

        assert!(migration.is_reversible());
        let down = migration.down_operations().unwrap();
        assert_eq!(down.len(), 1);
        assert!(matches!(&down[0], SchemaOperation::ChangeColumn { .. }));
    }
}
