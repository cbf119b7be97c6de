//! Schema Engine - Executes schema operations
//!
//! The engine is the collaborator that performs physical DDL. `MemoryEngine`
//! keeps an in-memory catalog and validates every operation structurally; it
//! backs tests and dry runs. The Postgres engine lives in `postgres`.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{MigrationError, MigrationResult};
use crate::operations::{ColumnDef, SchemaOperation};

/// Accepts schema operations and performs the physical DDL
#[async_trait]
pub trait SchemaEngine: Send {
    /// Apply a single operation. On failure the target schema must be left
    /// unchanged by that operation.
    async fn apply(&mut self, operation: &SchemaOperation) -> MigrationResult<()>;
}

/// In-memory table state tracked by `MemoryEngine`
#[derive(Debug, Clone, Default)]
pub struct TableState {
    columns: Vec<ColumnDef>,
    /// (column, unique) pairs
    indexes: Vec<(String, bool)>,
}

impl TableState {
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn has_index(&self, column: &str) -> bool {
        self.indexes.iter().any(|(c, _)| c == column)
    }
}

/// Schema engine backed by an in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    tables: BTreeMap<String, TableState>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&TableState> {
        self.tables.get(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }

    fn fail(operation: &SchemaOperation, cause: String) -> MigrationError {
        MigrationError::OperationFailed {
            operation: operation.clone(),
            cause,
        }
    }

    fn table_mut(
        &mut self,
        operation: &SchemaOperation,
        name: &str,
    ) -> MigrationResult<&mut TableState> {
        match self.tables.get_mut(name) {
            Some(state) => Ok(state),
            None => Err(Self::fail(
                operation,
                format!("table {} does not exist", name),
            )),
        }
    }
}

#[async_trait]
impl SchemaEngine for MemoryEngine {
    async fn apply(&mut self, operation: &SchemaOperation) -> MigrationResult<()> {
        match operation {
            SchemaOperation::CreateTable { name, columns } => {
                if self.tables.contains_key(name) {
                    return Err(Self::fail(
                        operation,
                        format!("table {} already exists", name),
                    ));
                }
                let mut seen = Vec::new();
                for column in columns {
                    if seen.contains(&&column.name) {
                        return Err(Self::fail(
                            operation,
                            format!("duplicate column {} in table {}", column.name, name),
                        ));
                    }
                    seen.push(&column.name);
                }
                self.tables.insert(
                    name.clone(),
                    TableState {
                        columns: columns.clone(),
                        indexes: Vec::new(),
                    },
                );
            }
            SchemaOperation::DropTable { name } => {
                if self.tables.remove(name).is_none() {
                    return Err(Self::fail(
                        operation,
                        format!("table {} does not exist", name),
                    ));
                }
            }
            SchemaOperation::AddColumn { table, column } => {
                let state = self.table_mut(operation, table)?;
                if state.has_column(&column.name) {
                    return Err(Self::fail(
                        operation,
                        format!("column {} already exists on {}", column.name, table),
                    ));
                }
                state.columns.push(column.clone());
            }
            SchemaOperation::RemoveColumn { table, name } => {
                let state = self.table_mut(operation, table)?;
                let before = state.columns.len();
                state.columns.retain(|c| c.name != *name);
                if state.columns.len() == before {
                    return Err(Self::fail(
                        operation,
                        format!("table {} has no column {}", table, name),
                    ));
                }
                state.indexes.retain(|(c, _)| c != name);
            }
            SchemaOperation::RenameColumn { table, from, to } => {
                let state = self.table_mut(operation, table)?;
                if state.has_column(to) {
                    return Err(Self::fail(
                        operation,
                        format!("column {} already exists on {}", to, table),
                    ));
                }
                if !state.has_column(from) {
                    return Err(Self::fail(
                        operation,
                        format!("table {} has no column {}", table, from),
                    ));
                }
                for column in &mut state.columns {
                    if column.name == *from {
                        column.name = to.clone();
                    }
                }
                for (indexed, _) in &mut state.indexes {
                    if indexed == from {
                        *indexed = to.clone();
                    }
                }
            }
            SchemaOperation::AddIndex {
                table,
                column,
                unique,
            } => {
                let state = self.table_mut(operation, table)?;
                if !state.has_column(column) {
                    return Err(Self::fail(
                        operation,
                        format!("table {} has no column {}", table, column),
                    ));
                }
                if state.has_index(column) {
                    return Err(Self::fail(
                        operation,
                        format!("index on {}.{} already exists", table, column),
                    ));
                }
                state.indexes.push((column.clone(), *unique));
            }
            SchemaOperation::DropIndex { table, column } => {
                let state = self.table_mut(operation, table)?;
                let before = state.indexes.len();
                state.indexes.retain(|(c, _)| c != column);
                if state.indexes.len() == before {
                    return Err(Self::fail(
                        operation,
                        format!("no index on {}.{}", table, column),
                    ));
                }
            }
            SchemaOperation::ChangeColumn {
                table,
                name,
                changes,
            } => {
                if changes.is_empty() {
                    return Err(Self::fail(operation, "no attribute changes given".into()));
                }
                let state = self.table_mut(operation, table)?;
                let column = match state.columns.iter_mut().find(|c| c.name == *name) {
                    Some(column) => column,
                    None => {
                        return Err(Self::fail(
                            operation,
                            format!("table {} has no column {}", table, name),
                        ))
                    }
                };
                if let Some(ty) = &changes.ty {
                    column.ty = ty.clone();
                }
                if let Some(nullable) = changes.nullable {
                    column.nullable = nullable;
                }
                if let Some(default) = &changes.default {
                    column.default = default.clone();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{ColumnChanges, ColumnType};
    use crate::schema::Schema;

    async fn engine_with_products() -> MemoryEngine {
        let mut engine = MemoryEngine::new();
        let mut schema = Schema::new();
        schema.create_table("products", |t| {
            t.id("id");
            t.string("name");
            t.string("description");
            t.string("part_number");
        });
        for op in schema.into_operations() {
            engine.apply(&op).await.unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn test_rename_missing_column_fails_and_leaves_table_unchanged() {
        let mut engine = engine_with_products().await;
        let rename = SchemaOperation::RenameColumn {
            table: "products".to_string(),
            from: "description".to_string(),
            to: "desc".to_string(),
        };
        engine.apply(&rename).await.unwrap();

        // Second rename now targets a column that no longer exists
        let err = engine.apply(&rename).await.unwrap_err();
        assert!(matches!(err, MigrationError::OperationFailed { .. }));

        let table = engine.table("products").unwrap();
        assert!(table.has_column("desc"));
        assert!(!table.has_column("description"));
        assert_eq!(table.columns().len(), 4);
    }

    #[tokio::test]
    async fn test_remove_column_drops_its_indexes() {
        let mut engine = engine_with_products().await;
        engine
            .apply(&SchemaOperation::AddIndex {
                table: "products".to_string(),
                column: "part_number".to_string(),
                unique: false,
            })
            .await
            .unwrap();
        assert!(engine.table("products").unwrap().has_index("part_number"));

        engine
            .apply(&SchemaOperation::RemoveColumn {
                table: "products".to_string(),
                name: "part_number".to_string(),
            })
            .await
            .unwrap();
        assert!(!engine.table("products").unwrap().has_index("part_number"));
    }

    #[tokio::test]
    async fn test_create_existing_table_fails() {
        let mut engine = engine_with_products().await;
        let err = engine
            .apply(&SchemaOperation::CreateTable {
                name: "products".to_string(),
                columns: vec![],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_change_column_attributes() {
        let mut engine = engine_with_products().await;
        engine
            .apply(&SchemaOperation::ChangeColumn {
                table: "products".to_string(),
                name: "name".to_string(),
                changes: ColumnChanges::new()
                    .set_type(ColumnType::String(Some(100)))
                    .set_nullable(false),
            })
            .await
            .unwrap();

        let column = engine.table("products").unwrap().column("name").unwrap();
        assert_eq!(column.ty, ColumnType::String(Some(100)));
        assert!(!column.nullable);
    }

    #[tokio::test]
    async fn test_index_on_missing_column_fails() {
        let mut engine = engine_with_products().await;
        let err = engine
            .apply(&SchemaOperation::AddIndex {
                table: "products".to_string(),
                column: "sku".to_string(),
                unique: true,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no column sku"));
    }
}
