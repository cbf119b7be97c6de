//! Schema DSL - Fluent builders for authoring migrations
//!
//! Accumulates `SchemaOperation` values in authored order, decoupled from any
//! particular schema engine. Rendering and execution happen later.

use crate::operations::{ColumnChanges, ColumnDef, ColumnType, SchemaOperation};

/// Accumulates schema operations for a migration
#[derive(Debug, Default)]
pub struct Schema {
    operations: Vec<SchemaOperation>,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Create a new table
    pub fn create_table<F>(&mut self, name: &str, callback: F) -> &mut Self
    where
        F: FnOnce(&mut TableBuilder),
    {
        let mut table = TableBuilder::new();
        callback(&mut table);

        self.operations.push(SchemaOperation::CreateTable {
            name: name.to_string(),
            columns: table.columns,
        });
        self
    }

    /// Alter an existing table with a block of changes
    pub fn change_table<F>(&mut self, name: &str, callback: F) -> &mut Self
    where
        F: FnOnce(&mut ChangeTableBuilder),
    {
        let mut table = ChangeTableBuilder::new(name);
        callback(&mut table);

        self.operations.extend(table.operations);
        self
    }

    /// Drop a table
    pub fn drop_table(&mut self, name: &str) -> &mut Self {
        self.operations.push(SchemaOperation::DropTable {
            name: name.to_string(),
        });
        self
    }

    /// Add a single column to an existing table
    pub fn add_column(&mut self, table: &str, column: ColumnDef) -> &mut Self {
        self.operations.push(SchemaOperation::AddColumn {
            table: table.to_string(),
            column,
        });
        self
    }

    /// Remove a column from an existing table
    pub fn remove_column(&mut self, table: &str, name: &str) -> &mut Self {
        self.operations.push(SchemaOperation::RemoveColumn {
            table: table.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Rename a column
    pub fn rename_column(&mut self, table: &str, from: &str, to: &str) -> &mut Self {
        self.operations.push(SchemaOperation::RenameColumn {
            table: table.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    /// Add an index on a column
    pub fn add_index(&mut self, table: &str, column: &str, unique: bool) -> &mut Self {
        self.operations.push(SchemaOperation::AddIndex {
            table: table.to_string(),
            column: column.to_string(),
            unique,
        });
        self
    }

    /// Drop an index on a column
    pub fn drop_index(&mut self, table: &str, column: &str) -> &mut Self {
        self.operations.push(SchemaOperation::DropIndex {
            table: table.to_string(),
            column: column.to_string(),
        });
        self
    }

    /// Change attributes of an existing column
    pub fn change_column(&mut self, table: &str, name: &str, changes: ColumnChanges) -> &mut Self {
        self.operations.push(SchemaOperation::ChangeColumn {
            table: table.to_string(),
            name: name.to_string(),
            changes,
        });
        self
    }

    /// The accumulated operations, in authored order
    pub fn into_operations(self) -> Vec<SchemaOperation> {
        self.operations
    }

    pub fn operations(&self) -> &[SchemaOperation] {
        &self.operations
    }
}

/// Column block for CREATE TABLE
pub struct TableBuilder {
    columns: Vec<ColumnDef>,
}

impl TableBuilder {
    fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    fn push(&mut self, column: ColumnDef) -> &mut ColumnDef {
        self.columns.push(column);
        let last = self.columns.len() - 1;
        &mut self.columns[last]
    }

    /// Add a column with an explicit type
    pub fn column(&mut self, name: &str, ty: ColumnType) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ty))
    }

    /// Add an auto-increment primary key
    pub fn id(&mut self, name: &str) -> &mut ColumnDef {
        let mut column = ColumnDef::new(name, ColumnType::Serial);
        column.primary_key();
        self.push(column)
    }

    /// Add a string column (TEXT unless a length is set via `varchar`)
    pub fn string(&mut self, name: &str) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ColumnType::String(None)))
    }

    /// Add a VARCHAR column with a length
    pub fn varchar(&mut self, name: &str, length: u32) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ColumnType::String(Some(length))))
    }

    pub fn text(&mut self, name: &str) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ColumnType::Text))
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ColumnType::Integer))
    }

    pub fn big_integer(&mut self, name: &str) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ColumnType::BigInteger))
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ColumnType::Boolean))
    }

    pub fn datetime(&mut self, name: &str) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ColumnType::DateTime))
    }

    pub fn uuid(&mut self, name: &str) -> &mut ColumnDef {
        self.push(ColumnDef::new(name, ColumnType::Uuid))
    }

    /// Add created_at and updated_at columns
    pub fn timestamps(&mut self) -> &mut Self {
        for name in ["created_at", "updated_at"] {
            let mut column = ColumnDef::new(name, ColumnType::DateTime);
            column.not_null().default_value("CURRENT_TIMESTAMP");
            self.columns.push(column);
        }
        self
    }
}

/// Change block for an existing table
pub struct ChangeTableBuilder {
    table: String,
    operations: Vec<SchemaOperation>,
}

impl ChangeTableBuilder {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            operations: Vec::new(),
        }
    }

    fn push_column(&mut self, column: ColumnDef) -> &mut ColumnDef {
        self.operations.push(SchemaOperation::AddColumn {
            table: self.table.clone(),
            column,
        });
        match self.operations.last_mut() {
            Some(SchemaOperation::AddColumn { column, .. }) => column,
            _ => unreachable!("push_column just pushed AddColumn"),
        }
    }

    /// Add a column with an explicit type
    pub fn column(&mut self, name: &str, ty: ColumnType) -> &mut ColumnDef {
        self.push_column(ColumnDef::new(name, ty))
    }

    pub fn string(&mut self, name: &str) -> &mut ColumnDef {
        self.push_column(ColumnDef::new(name, ColumnType::String(None)))
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnDef {
        self.push_column(ColumnDef::new(name, ColumnType::Integer))
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnDef {
        self.push_column(ColumnDef::new(name, ColumnType::Boolean))
    }

    pub fn datetime(&mut self, name: &str) -> &mut ColumnDef {
        self.push_column(ColumnDef::new(name, ColumnType::DateTime))
    }

    /// Remove a column
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.operations.push(SchemaOperation::RemoveColumn {
            table: self.table.clone(),
            name: name.to_string(),
        });
        self
    }

    /// Rename a column
    pub fn rename(&mut self, from: &str, to: &str) -> &mut Self {
        self.operations.push(SchemaOperation::RenameColumn {
            table: self.table.clone(),
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    /// Add an index on a column
    pub fn index(&mut self, column: &str) -> &mut Self {
        self.operations.push(SchemaOperation::AddIndex {
            table: self.table.clone(),
            column: column.to_string(),
            unique: false,
        });
        self
    }

    /// Add a unique index on a column
    pub fn unique_index(&mut self, column: &str) -> &mut Self {
        self.operations.push(SchemaOperation::AddIndex {
            table: self.table.clone(),
            column: column.to_string(),
            unique: true,
        });
        self
    }

    /// Change attributes of a column
    pub fn change(&mut self, name: &str, changes: ColumnChanges) -> &mut Self {
        self.operations.push(SchemaOperation::ChangeColumn {
            table: self.table.clone(),
            name: name.to_string(),
            changes,
        });
        self
    }
}
