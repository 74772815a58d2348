//! Migration to create the attributions table.
//!
//! Attribution rows are owned by their order (cascade on delete) and reference
//! a touchpoint without owning it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Attributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attributions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attributions::OrderId).uuid().not_null())
                    .col(ColumnDef::new(Attributions::TouchpointId).uuid().not_null())
                    .col(ColumnDef::new(Attributions::Model).text().not_null())
                    .col(
                        ColumnDef::new(Attributions::TimeToPurchase)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Attributions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attributions_order_id")
                            .from(Attributions::Table, Attributions::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attributions_touchpoint_id")
                            .from(Attributions::Table, Attributions::TouchpointId)
                            .to(Touchpoints::Table, Touchpoints::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Reports load rows per (order, model)
        manager
            .create_index(
                Index::create()
                    .name("idx_attributions_order_model")
                    .table(Attributions::Table)
                    .col(Attributions::OrderId)
                    .col(Attributions::Model)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_attributions_touchpoint_id")
                    .table(Attributions::Table)
                    .col(Attributions::TouchpointId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_attributions_order_model")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_attributions_touchpoint_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Attributions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Attributions {
    Table,
    Id,
    OrderId,
    TouchpointId,
    Model,
    TimeToPurchase,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Touchpoints {
    Table,
    Id,
}
