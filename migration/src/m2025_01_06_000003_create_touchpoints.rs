//! Migration to create the touchpoints table.
//!
//! Touchpoints are immutable once written by the ingestion path. The
//! `(visitor_id, timestamp)` index backs the attribution window scan.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Touchpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Touchpoints::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Touchpoints::VisitorId).uuid().not_null())
                    .col(ColumnDef::new(Touchpoints::SessionId).uuid().null())
                    .col(
                        ColumnDef::new(Touchpoints::EventType)
                            .text()
                            .not_null()
                            .default("page_view"),
                    )
                    .col(ColumnDef::new(Touchpoints::UtmSource).text().null())
                    .col(ColumnDef::new(Touchpoints::UtmMedium).text().null())
                    .col(ColumnDef::new(Touchpoints::UtmCampaign).text().null())
                    .col(ColumnDef::new(Touchpoints::UtmContent).text().null())
                    .col(ColumnDef::new(Touchpoints::UtmTerm).text().null())
                    .col(ColumnDef::new(Touchpoints::Fbclid).text().null())
                    .col(ColumnDef::new(Touchpoints::Ttclid).text().null())
                    .col(ColumnDef::new(Touchpoints::Gclid).text().null())
                    .col(ColumnDef::new(Touchpoints::Wbraid).text().null())
                    .col(ColumnDef::new(Touchpoints::Gbraid).text().null())
                    .col(ColumnDef::new(Touchpoints::Msclkid).text().null())
                    .col(ColumnDef::new(Touchpoints::Sccid).text().null())
                    .col(ColumnDef::new(Touchpoints::Referrer).text().null())
                    .col(ColumnDef::new(Touchpoints::LandingUrl).text().null())
                    .col(
                        ColumnDef::new(Touchpoints::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_touchpoints_visitor_id")
                            .from(Touchpoints::Table, Touchpoints::VisitorId)
                            .to(Visitors::Table, Visitors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_touchpoints_session_id")
                            .from(Touchpoints::Table, Touchpoints::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_touchpoints_visitor_timestamp")
                    .table(Touchpoints::Table)
                    .col(Touchpoints::VisitorId)
                    .col(Touchpoints::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_touchpoints_visitor_timestamp")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Touchpoints::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Touchpoints {
    Table,
    Id,
    VisitorId,
    SessionId,
    EventType,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmContent,
    UtmTerm,
    Fbclid,
    Ttclid,
    Gclid,
    Wbraid,
    Gbraid,
    Msclkid,
    Sccid,
    Referrer,
    LandingUrl,
    Timestamp,
}

#[derive(DeriveIden)]
enum Visitors {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
}
