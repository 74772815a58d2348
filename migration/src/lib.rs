//! Database migrations for the attribution service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_000001_create_visitors;
mod m2025_01_06_000002_create_sessions;
mod m2025_01_06_000003_create_touchpoints;
mod m2025_01_06_000004_create_orders;
mod m2025_01_06_000005_create_order_items;
mod m2025_01_06_000006_create_attributions;
mod m2025_01_13_000100_add_attribution_unique_guards;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_000001_create_visitors::Migration),
            Box::new(m2025_01_06_000002_create_sessions::Migration),
            Box::new(m2025_01_06_000003_create_touchpoints::Migration),
            Box::new(m2025_01_06_000004_create_orders::Migration),
            Box::new(m2025_01_06_000005_create_order_items::Migration),
            Box::new(m2025_01_06_000006_create_attributions::Migration),
            Box::new(m2025_01_13_000100_add_attribution_unique_guards::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm_migration::sea_orm::{ConnectOptions, Database, DatabaseConnection, Statement};

    async fn memory_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);
        Database::connect(opt).await.unwrap()
    }

    async fn index_names(db: &DatabaseConnection) -> Vec<String> {
        let rows = db
            .query_all(Statement::from_string(
                db.get_database_backend(),
                "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'attributions'",
            ))
            .await
            .unwrap();
        rows.iter()
            .map(|row| row.try_get::<String>("", "name").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn migrations_apply_and_revert_on_sqlite() {
        let db = memory_db().await;

        Migrator::up(&db, None).await.unwrap();

        let manager = SchemaManager::new(&db);
        for table in [
            "visitors",
            "sessions",
            "touchpoints",
            "orders",
            "order_items",
            "attributions",
        ] {
            assert!(manager.has_table(table).await.unwrap(), "{table} missing");
        }
        let indexes = index_names(&db).await;
        assert!(indexes.iter().any(|n| n == "idx_attributions_order_model_touchpoint"));
        assert!(indexes.iter().any(|n| n == "idx_attributions_single_endpoint"));

        Migrator::down(&db, None).await.unwrap();

        assert!(!manager.has_table("attributions").await.unwrap());
        assert!(!manager.has_table("visitors").await.unwrap());
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = memory_db().await;

        Migrator::up(&db, None).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let applied = Migrator::get_applied_migrations(&db).await.unwrap();
        assert_eq!(applied.len(), Migrator::migrations().len());
    }
}
