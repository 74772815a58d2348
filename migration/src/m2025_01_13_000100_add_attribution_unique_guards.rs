//! Adds the unique indexes that make attribution inserts idempotent.
//!
//! `idx_attributions_order_model_touchpoint` is the insert-or-ignore conflict
//! target. The partial index keeps at most one first_touch and one last_touch
//! row per order, so concurrent linkers cannot each persist their own set.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

const UP_STATEMENTS: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_attributions_order_model_touchpoint \
     ON attributions (order_id, model, touchpoint_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_attributions_single_endpoint \
     ON attributions (order_id, model) \
     WHERE model IN ('first_touch','last_touch')",
];

const DOWN_STATEMENTS: &[&str] = &[
    "DROP INDEX IF EXISTS idx_attributions_single_endpoint",
    "DROP INDEX IF EXISTS idx_attributions_order_model_touchpoint",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        for sql in UP_STATEMENTS {
            manager
                .get_connection()
                .execute(Statement::from_string(backend, (*sql).to_owned()))
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        for sql in DOWN_STATEMENTS {
            manager
                .get_connection()
                .execute(Statement::from_string(backend, (*sql).to_owned()))
                .await?;
        }
        Ok(())
    }
}
