//! Uploaded media objects and who uploaded them.

use sea_orm_migration::prelude::*;

use crate::m20250101_000001_create_accounts::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MediaObjects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MediaObjects::Key)
                            .string_len(100)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MediaObjects::UploaderId).uuid().not_null())
                    .col(
                        ColumnDef::new(MediaObjects::ContentType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MediaObjects::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(MediaObjects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_media_objects_uploader")
                            .from(MediaObjects::Table, MediaObjects::UploaderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_media_objects_uploader")
                    .table(MediaObjects::Table)
                    .col(MediaObjects::UploaderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MediaObjects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MediaObjects {
    Table,
    Key,
    UploaderId,
    ContentType,
    Size,
    CreatedAt,
}
