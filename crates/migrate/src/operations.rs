//! Schema Operations - The unit of schema change
//!
//! A migration is an ordered list of `SchemaOperation` values. Operations are
//! engine-agnostic: the in-memory engine validates them structurally while the
//! Postgres engine renders them to DDL.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Column types supported by the schema DSL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// VARCHAR(n), or TEXT when no length is given
    String(Option<u32>),
    Text,
    Integer,
    BigInteger,
    Boolean,
    DateTime,
    /// Auto-increment primary key
    Serial,
    Uuid,
}

impl ColumnType {
    /// Render the Postgres type name
    pub fn to_sql(&self) -> String {
        match self {
            ColumnType::String(Some(len)) => format!("VARCHAR({})", len),
            ColumnType::String(None) | ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInteger => "BIGINT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::DateTime => "TIMESTAMP".to_string(),
            ColumnType::Serial => "SERIAL".to_string(),
            ColumnType::Uuid => "UUID".to_string(),
        }
    }
}

/// A column definition used by `CreateTable` and `AddColumn`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Default value as a SQL literal (already quoted where needed)
    pub default: Option<String>,
    pub unique: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            nullable: true,
            default: None,
            unique: false,
            primary_key: false,
        }
    }

    /// Mark the column NOT NULL
    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = false;
        self
    }

    /// Set a default value (SQL literal)
    pub fn default_value(&mut self, default: &str) -> &mut Self {
        self.default = Some(default.to_string());
        self
    }

    /// Add a UNIQUE constraint on the column
    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    /// Mark as primary key
    pub fn primary_key(&mut self) -> &mut Self {
        self.primary_key = true;
        self
    }

    /// Render the column clause of a CREATE TABLE / ADD COLUMN statement
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.ty.to_sql());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        sql
    }
}

/// Attribute changes for `ChangeColumn`
///
/// Only the attributes that are `Some` are altered. `default: Some(None)`
/// drops an existing default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChanges {
    pub ty: Option<ColumnType>,
    pub nullable: Option<bool>,
    pub default: Option<Option<String>>,
}

impl ColumnChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type(mut self, ty: ColumnType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn set_default(mut self, default: Option<&str>) -> Self {
        self.default = Some(default.map(|d| d.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ty.is_none() && self.nullable.is_none() && self.default.is_none()
    }
}

/// A single schema change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaOperation {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        name: String,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    RemoveColumn {
        table: String,
        name: String,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    AddIndex {
        table: String,
        column: String,
        unique: bool,
    },
    DropIndex {
        table: String,
        column: String,
    },
    ChangeColumn {
        table: String,
        name: String,
        changes: ColumnChanges,
    },
}

impl SchemaOperation {
    /// The operation that undoes this one, if it can be derived
    ///
    /// Destructive operations (`DropTable`, `RemoveColumn`, `DropIndex`) and
    /// `ChangeColumn` lose the information needed to reconstruct the prior
    /// state, so they have no derivable inverse and require an explicit down
    /// definition.
    pub fn inverse(&self) -> Option<SchemaOperation> {
        match self {
            SchemaOperation::CreateTable { name, .. } => Some(SchemaOperation::DropTable {
                name: name.clone(),
            }),
            SchemaOperation::AddColumn { table, column } => Some(SchemaOperation::RemoveColumn {
                table: table.clone(),
                name: column.name.clone(),
            }),
            SchemaOperation::RenameColumn { table, from, to } => {
                Some(SchemaOperation::RenameColumn {
                    table: table.clone(),
                    from: to.clone(),
                    to: from.clone(),
                })
            }
            SchemaOperation::AddIndex { table, column, .. } => Some(SchemaOperation::DropIndex {
                table: table.clone(),
                column: column.clone(),
            }),
            SchemaOperation::DropTable { .. }
            | SchemaOperation::RemoveColumn { .. }
            | SchemaOperation::DropIndex { .. }
            | SchemaOperation::ChangeColumn { .. } => None,
        }
    }

    /// The table this operation targets
    pub fn table(&self) -> &str {
        match self {
            SchemaOperation::CreateTable { name, .. } | SchemaOperation::DropTable { name } => name,
            SchemaOperation::AddColumn { table, .. }
            | SchemaOperation::RemoveColumn { table, .. }
            | SchemaOperation::RenameColumn { table, .. }
            | SchemaOperation::AddIndex { table, .. }
            | SchemaOperation::DropIndex { table, .. }
            | SchemaOperation::ChangeColumn { table, .. } => table,
        }
    }

    /// Conventional index name, shared by `AddIndex` and `DropIndex`
    pub fn index_name(table: &str, column: &str) -> String {
        format!("idx_{}_{}", table, column)
    }

    /// Render the operation as one or more Postgres DDL statements
    pub fn to_sql(&self) -> Vec<String> {
        match self {
            SchemaOperation::CreateTable { name, columns } => {
                let column_sql: Vec<String> = columns.iter().map(|c| c.to_sql()).collect();
                vec![format!(
                    "CREATE TABLE {} (\n    {}\n);",
                    name,
                    column_sql.join(",\n    ")
                )]
            }
            SchemaOperation::DropTable { name } => {
                vec![format!("DROP TABLE IF EXISTS {};", name)]
            }
            SchemaOperation::AddColumn { table, column } => {
                vec![format!(
                    "ALTER TABLE {} ADD COLUMN {};",
                    table,
                    column.to_sql()
                )]
            }
            SchemaOperation::RemoveColumn { table, name } => {
                vec![format!("ALTER TABLE {} DROP COLUMN {};", table, name)]
            }
            SchemaOperation::RenameColumn { table, from, to } => {
                vec![format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {};",
                    table, from, to
                )]
            }
            SchemaOperation::AddIndex {
                table,
                column,
                unique,
            } => {
                let unique_sql = if *unique { "UNIQUE " } else { "" };
                vec![format!(
                    "CREATE {}INDEX {} ON {} ({});",
                    unique_sql,
                    Self::index_name(table, column),
                    table,
                    column
                )]
            }
            SchemaOperation::DropIndex { table, column } => {
                vec![format!(
                    "DROP INDEX IF EXISTS {};",
                    Self::index_name(table, column)
                )]
            }
            SchemaOperation::ChangeColumn {
                table,
                name,
                changes,
            } => {
                let mut statements = Vec::new();
                if let Some(ty) = &changes.ty {
                    statements.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} TYPE {};",
                        table,
                        name,
                        ty.to_sql()
                    ));
                }
                if let Some(nullable) = changes.nullable {
                    let action = if nullable { "DROP" } else { "SET" };
                    statements.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL;",
                        table, name, action
                    ));
                }
                if let Some(default) = &changes.default {
                    match default {
                        Some(value) => statements.push(format!(
                            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};",
                            table, name, value
                        )),
                        None => statements.push(format!(
                            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;",
                            table, name
                        )),
                    }
                }
                statements
            }
        }
    }
}

impl fmt::Display for SchemaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaOperation::CreateTable { name, columns } => {
                write!(f, "create table {} ({} columns)", name, columns.len())
            }
            SchemaOperation::DropTable { name } => write!(f, "drop table {}", name),
            SchemaOperation::AddColumn { table, column } => {
                write!(f, "add column {}.{}", table, column.name)
            }
            SchemaOperation::RemoveColumn { table, name } => {
                write!(f, "remove column {}.{}", table, name)
            }
            SchemaOperation::RenameColumn { table, from, to } => {
                write!(f, "rename column {}.{} to {}", table, from, to)
            }
            SchemaOperation::AddIndex {
                table,
                column,
                unique,
            } => {
                let kind = if *unique { "unique index" } else { "index" };
                write!(f, "add {} on {}.{}", kind, table, column)
            }
            SchemaOperation::DropIndex { table, column } => {
                write!(f, "drop index on {}.{}", table, column)
            }
            SchemaOperation::ChangeColumn { table, name, .. } => {
                write!(f, "change column {}.{}", table, name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        let mut column = ColumnDef::new("email", ColumnType::String(Some(255)));
        column.not_null().unique();

        let op = SchemaOperation::CreateTable {
            name: "users".to_string(),
            columns: vec![
                {
                    let mut id = ColumnDef::new("id", ColumnType::Serial);
                    id.primary_key();
                    id
                },
                column,
            ],
        };

        let sql = op.to_sql().join("\n");
        assert!(sql.contains("CREATE TABLE users"));
        assert!(sql.contains("id SERIAL PRIMARY KEY"));
        assert!(sql.contains("email VARCHAR(255) NOT NULL UNIQUE"));
    }

    #[test]
    fn test_add_column_with_default_sql() {
        let mut column = ColumnDef::new("email", ColumnType::String(None));
        column.not_null().default_value("'random@email.com'");

        let op = SchemaOperation::AddColumn {
            table: "dummies".to_string(),
            column,
        };

        assert_eq!(
            op.to_sql(),
            vec![
                "ALTER TABLE dummies ADD COLUMN email TEXT NOT NULL DEFAULT 'random@email.com';"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_unique_index_sql() {
        let op = SchemaOperation::AddIndex {
            table: "dummies".to_string(),
            column: "email".to_string(),
            unique: true,
        };

        assert_eq!(
            op.to_sql(),
            vec!["CREATE UNIQUE INDEX idx_dummies_email ON dummies (email);".to_string()]
        );
    }

    #[test]
    fn test_change_column_renders_one_statement_per_attribute() {
        let op = SchemaOperation::ChangeColumn {
            table: "products".to_string(),
            name: "price".to_string(),
            changes: ColumnChanges::new()
                .set_type(ColumnType::BigInteger)
                .set_nullable(false)
                .set_default(Some("0")),
        };

        let statements = op.to_sql();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("TYPE BIGINT"));
        assert!(statements[1].contains("SET NOT NULL"));
        assert!(statements[2].contains("SET DEFAULT 0"));
    }

    #[test]
    fn test_inverse_of_constructive_operations() {
        let create = SchemaOperation::CreateTable {
            name: "users".to_string(),
            columns: vec![],
        };
        assert_eq!(
            create.inverse(),
            Some(SchemaOperation::DropTable {
                name: "users".to_string()
            })
        );

        let rename = SchemaOperation::RenameColumn {
            table: "products".to_string(),
            from: "description".to_string(),
            to: "desc".to_string(),
        };
        assert_eq!(
            rename.inverse(),
            Some(SchemaOperation::RenameColumn {
                table: "products".to_string(),
                from: "desc".to_string(),
                to: "description".to_string(),
            })
        );
    }

    #[test]
    fn test_destructive_operations_have_no_inverse() {
        let remove = SchemaOperation::RemoveColumn {
            table: "products".to_string(),
            name: "name".to_string(),
        };
        assert_eq!(remove.inverse(), None);

        let change = SchemaOperation::ChangeColumn {
            table: "products".to_string(),
            name: "price".to_string(),
            changes: ColumnChanges::new().set_nullable(false),
        };
        assert_eq!(change.inverse(), None);
    }
}
