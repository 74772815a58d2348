//! Migration to create the orders table.
//!
//! Orders are written by webhook ingestion. `visitor_id` stays nullable because
//! no identity resolution exists when the storefront did not pass a visitor.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::OrderId).text().not_null().unique_key())
                    .col(ColumnDef::new(Orders::VisitorId).uuid().null())
                    .col(
                        ColumnDef::new(Orders::TotalCost)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_visitor_id")
                            .from(Orders::Table, Orders::VisitorId)
                            .to(Visitors::Table, Visitors::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Reporting scans by date range, optionally narrowed by status
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_created_at_status")
                    .table(Orders::Table)
                    .col(Orders::CreatedAt)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_orders_created_at_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderId,
    VisitorId,
    TotalCost,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Visitors {
    Table,
    Id,
}
