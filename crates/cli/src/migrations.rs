//! The application's migration set, in authoring order
//!
//! Identifiers are authoring timestamps; their ascending order is the apply
//! order regardless of the order in this list.

use stratum_migrate::Migration;

pub fn all() -> Vec<Migration> {
    vec![
        create_dummies(),
        add_email_to_dummies(),
        create_users(),
        create_products(),
        change_products(),
    ]
}

fn create_dummies() -> Migration {
    Migration::change("20230516102147", "create dummies", |schema| {
        schema.create_table("dummies", |t| {
            t.id("id");
            t.string("name");
            t.integer("age");
            t.datetime("dob");
            t.timestamps();
        });
    })
}

fn add_email_to_dummies() -> Migration {
    Migration::change("20230516114831", "add email to dummies", |schema| {
        schema.change_table("dummies", |t| {
            t.string("email")
                .not_null()
                .default_value("'random@email.com'");
            t.unique_index("email");
        });
    })
}

fn create_users() -> Migration {
    Migration::change("20230618142459", "create users", |schema| {
        schema.create_table("users", |t| {
            t.id("id");
            t.string("name");
            t.string("occupation");
            t.integer("max_login_attempts");
            t.boolean("must_change_password");
            t.timestamps();
        });
    })
}

fn create_products() -> Migration {
    Migration::change("20230618150000", "create products", |schema| {
        schema.create_table("products", |t| {
            t.id("id");
            t.string("name");
            t.string("description");
            t.string("part_number");
            t.timestamps();
        });
    })
}

/// Removes a column, so the down must be written out by hand
fn change_products() -> Migration {
    Migration::up_down(
        "20230619064021",
        "change products",
        |schema| {
            schema.change_table("products", |t| {
                t.remove("name");
                t.string("sale_location");
                t.index("part_number");
                t.rename("description", "desc");
            });
        },
        |schema| {
            schema.change_table("products", |t| {
                t.rename("desc", "description");
            });
            schema.drop_index("products", "part_number");
            schema.remove_column("products", "sale_location");
            schema.add_column(
                "products",
                stratum_migrate::ColumnDef::new(
                    "name",
                    stratum_migrate::ColumnType::String(None),
                ),
            );
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_migrate::{MemoryEngine, MemoryHistory, MigrationRollback, MigrationRunner};

    #[tokio::test]
    async fn migration_set_applies_cleanly_from_scratch() {
        let mut runner = MigrationRunner::new(MemoryEngine::new(), MemoryHistory::new());
        let result = runner.run(&all()).await.unwrap();

        assert_eq!(result.applied_count, 5);
        let products = runner.engine().table("products").unwrap();
        assert!(products.has_column("desc"));
        assert!(products.has_column("sale_location"));
        assert!(!products.has_column("name"));
        assert!(products.has_index("part_number"));
    }

    #[tokio::test]
    async fn migration_set_rolls_back_to_empty_schema() {
        let mut runner = MigrationRunner::new(MemoryEngine::new(), MemoryHistory::new());
        let migrations = all();
        runner.run(&migrations).await.unwrap();

        let result = runner.rollback_all(&migrations).await.unwrap();
        assert_eq!(result.rolled_back_count, 5);
        assert!(runner.engine().table_names().is_empty());
    }

    #[test]
    fn identifiers_are_unique_and_ordered() {
        let migrations = all();
        let mut ids: Vec<&str> = migrations.iter().map(|m| m.id.as_str()).collect();
        let original = ids.clone();
        ids.sort();
        ids.dedup();
        assert_eq!(ids, original);
    }
}
