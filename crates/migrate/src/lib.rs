//! # stratum-migrate: Schema migration engine
//!
//! Orders and applies timestamped schema migrations against a target schema,
//! tracking completion in a history store so repeated runs are idempotent.
//! Migrations are authored with a fluent schema DSL that accumulates
//! engine-agnostic operations; engines (in-memory or Postgres) execute them.
//!
//! ```rust
//! use stratum_migrate::{Migration, MigrationRunner, MemoryEngine, MemoryHistory};
//!
//! let migrations = vec![Migration::change("20230516102147", "create dummies", |schema| {
//!     schema.create_table("dummies", |t| {
//!         t.id("id");
//!         t.string("name");
//!         t.integer("age");
//!         t.datetime("dob");
//!         t.timestamps();
//!     });
//! })];
//!
//! # tokio_test::block_on(async {
//! let mut runner = MigrationRunner::new(MemoryEngine::new(), MemoryHistory::new());
//! let result = runner.run(&migrations).await.unwrap();
//! assert_eq!(result.applied_count, 1);
//! # });
//! ```

pub mod definitions;
pub mod engine;
pub mod error;
pub mod history;
pub mod operations;
pub mod postgres;
pub mod rollback;
pub mod runner;
pub mod schema;

pub use definitions::{
    Migration, MigrationConfig, MigrationRunResult, MigrationStatus, RollbackResult,
};
pub use engine::{MemoryEngine, SchemaEngine, TableState};
pub use error::{MigrationError, MigrationResult};
pub use history::{AppliedMigration, MemoryHistory, MigrationHistory};
pub use operations::{ColumnChanges, ColumnDef, ColumnType, SchemaOperation};
pub use postgres::{PostgresEngine, PostgresHistory};
pub use rollback::MigrationRollback;
pub use runner::{plan, MigrationRunner};
pub use schema::{ChangeTableBuilder, Schema, TableBuilder};
