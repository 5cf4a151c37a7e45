//! Per-organization sync progress counters.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncStatus::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncStatus::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncStatus::Org).string().not_null())
                    .col(ColumnDef::new(SyncStatus::Entity).string().not_null())
                    .col(
                        ColumnDef::new(SyncStatus::Total)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatus::Done)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatus::Failed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatus::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_status_org_entity")
                    .table(SyncStatus::Table)
                    .col(SyncStatus::Org)
                    .col(SyncStatus::Entity)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncStatus::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncStatus {
    Table,
    Id,
    Org,
    Entity,
    Total,
    Done,
    Failed,
    UpdatedAt,
}
