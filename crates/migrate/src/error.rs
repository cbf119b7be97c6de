//! Error types for the migration engine

use crate::operations::SchemaOperation;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration operations
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The schema engine rejected an operation. The owning migration is not
    /// marked applied and its remaining operations are skipped.
    #[error("operation failed ({operation}): {cause}")]
    OperationFailed {
        operation: SchemaOperation,
        cause: String,
    },

    /// A rollback was requested for an operation with no defined inverse
    #[error("migration {id} is irreversible: no inverse for '{operation}'")]
    Irreversible { id: String, operation: String },

    /// Two migrations share the same identifier
    #[error("duplicate migration id: {0}")]
    DuplicateId(String),

    /// The history store references a migration that is not registered
    #[error("unknown migration: {0}")]
    UnknownMigration(String),

    /// Migration-history store failure
    #[error("history store error: {0}")]
    History(String),

    /// Underlying database failure outside a schema operation
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
