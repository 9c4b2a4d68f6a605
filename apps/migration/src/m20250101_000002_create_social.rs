//! Posts, the follow/block graph, engagement and notifications.

use sea_orm_migration::prelude::*;

use crate::m20250101_000001_create_accounts::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn created_at<T: IntoIden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

fn cascade_to_user<T, C>(name: &str, table: T, col: C) -> ForeignKeyCreateStatement
where
    T: IntoIden + 'static,
    C: IntoIden + 'static,
{
    ForeignKey::create()
        .name(name)
        .from(table, col)
        .to(Users::Table, Users::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

fn cascade_to_post<T, C>(name: &str, table: T, col: C) -> ForeignKeyCreateStatement
where
    T: IntoIden + 'static,
    C: IntoIden + 'static,
{
    ForeignKey::create()
        .name(name)
        .from(table, col)
        .to(Posts::Table, Posts::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // posts
        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Posts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Posts::UserId).uuid().not_null())
                    .col(ColumnDef::new(Posts::Description).text())
                    .col(ColumnDef::new(Posts::MediaKey).string().not_null())
                    .col(
                        ColumnDef::new(Posts::Kind)
                            .string_len(10)
                            .not_null()
                            .default("post"),
                    )
                    .col(created_at(Posts::CreatedAt))
                    .col(created_at(Posts::UpdatedAt))
                    .check(Expr::col(Posts::Kind).is_in(["post", "reel", "carousel"]))
                    .foreign_key(&mut cascade_to_user("fk_posts_user", Posts::Table, Posts::UserId))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_user_created")
                    .table(Posts::Table)
                    .col(Posts::UserId)
                    .col(Posts::CreatedAt)
                    .to_owned(),
            )
            .await?;
        // an uploaded object backs at most one post
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_media_key")
                    .table(Posts::Table)
                    .col(Posts::MediaKey)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_created")
                    .table(Posts::Table)
                    .col(Posts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // follows and blocks
        manager
            .create_table(
                Table::create()
                    .table(Follows::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Follows::FollowerId).uuid().not_null())
                    .col(ColumnDef::new(Follows::FolloweeId).uuid().not_null())
                    .col(created_at(Follows::CreatedAt))
                    .primary_key(
                        Index::create()
                            .col(Follows::FollowerId)
                            .col(Follows::FolloweeId),
                    )
                    .check(Expr::col(Follows::FollowerId).ne(Expr::col(Follows::FolloweeId)))
                    .foreign_key(&mut cascade_to_user(
                        "fk_follows_follower",
                        Follows::Table,
                        Follows::FollowerId,
                    ))
                    .foreign_key(&mut cascade_to_user(
                        "fk_follows_followee",
                        Follows::Table,
                        Follows::FolloweeId,
                    ))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_follows_followee")
                    .table(Follows::Table)
                    .col(Follows::FolloweeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Blocks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Blocks::BlockerId).uuid().not_null())
                    .col(ColumnDef::new(Blocks::BlockedId).uuid().not_null())
                    .col(created_at(Blocks::CreatedAt))
                    .primary_key(Index::create().col(Blocks::BlockerId).col(Blocks::BlockedId))
                    .check(Expr::col(Blocks::BlockerId).ne(Expr::col(Blocks::BlockedId)))
                    .foreign_key(&mut cascade_to_user(
                        "fk_blocks_blocker",
                        Blocks::Table,
                        Blocks::BlockerId,
                    ))
                    .foreign_key(&mut cascade_to_user(
                        "fk_blocks_blocked",
                        Blocks::Table,
                        Blocks::BlockedId,
                    ))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_blocked")
                    .table(Blocks::Table)
                    .col(Blocks::BlockedId)
                    .to_owned(),
            )
            .await?;

        // likes and saved posts share a shape
        for (table, user_fk, post_fk, post_idx) in [
            (
                Engagement::Likes,
                "fk_likes_user",
                "fk_likes_post",
                "idx_likes_post",
            ),
            (
                Engagement::SavedPosts,
                "fk_saved_posts_user",
                "fk_saved_posts_post",
                "idx_saved_posts_post",
            ),
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(ColumnDef::new(Engagement::UserId).uuid().not_null())
                        .col(ColumnDef::new(Engagement::PostId).uuid().not_null())
                        .col(created_at(Engagement::CreatedAt))
                        .primary_key(
                            Index::create()
                                .col(Engagement::UserId)
                                .col(Engagement::PostId),
                        )
                        .foreign_key(&mut cascade_to_user(user_fk, table, Engagement::UserId))
                        .foreign_key(&mut cascade_to_post(post_fk, table, Engagement::PostId))
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name(post_idx)
                        .table(table)
                        .col(Engagement::PostId)
                        .to_owned(),
                )
                .await?;
        }

        // comments; replies point at their top-level comment
        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Comments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Comments::PostId).uuid().not_null())
                    .col(ColumnDef::new(Comments::UserId).uuid().not_null())
                    .col(ColumnDef::new(Comments::ParentId).uuid())
                    .col(ColumnDef::new(Comments::Text).text().not_null())
                    .col(created_at(Comments::CreatedAt))
                    .foreign_key(&mut cascade_to_post(
                        "fk_comments_post",
                        Comments::Table,
                        Comments::PostId,
                    ))
                    .foreign_key(&mut cascade_to_user(
                        "fk_comments_user",
                        Comments::Table,
                        Comments::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_parent")
                            .from(Comments::Table, Comments::ParentId)
                            .to(Comments::Table, Comments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_comments_post_created")
                    .table(Comments::Table)
                    .col(Comments::PostId)
                    .col(Comments::CreatedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_comments_parent")
                    .table(Comments::Table)
                    .col(Comments::ParentId)
                    .to_owned(),
            )
            .await?;

        // notifications
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::RecipientId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::ActorId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(Notifications::PostId).uuid())
                    .col(
                        ColumnDef::new(Notifications::Read)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(created_at(Notifications::CreatedAt))
                    .foreign_key(&mut cascade_to_user(
                        "fk_notifications_recipient",
                        Notifications::Table,
                        Notifications::RecipientId,
                    ))
                    .foreign_key(&mut cascade_to_user(
                        "fk_notifications_actor",
                        Notifications::Table,
                        Notifications::ActorId,
                    ))
                    .foreign_key(&mut cascade_to_post(
                        "fk_notifications_post",
                        Notifications::Table,
                        Notifications::PostId,
                    ))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_recipient_created")
                    .table(Notifications::Table)
                    .col(Notifications::RecipientId)
                    .col(Notifications::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Notifications::Table.into_iden(),
            Comments::Table.into_iden(),
            Engagement::SavedPosts.into_iden(),
            Engagement::Likes.into_iden(),
            Blocks::Table.into_iden(),
            Follows::Table.into_iden(),
            Posts::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Posts {
    Table,
    Id,
    UserId,
    Description,
    MediaKey,
    Kind,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Follows {
    Table,
    FollowerId,
    FolloweeId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Blocks {
    Table,
    BlockerId,
    BlockedId,
    CreatedAt,
}

/// Columns shared by `likes` and `saved_posts`.
#[derive(DeriveIden, Clone, Copy)]
enum Engagement {
    Likes,
    SavedPosts,
    UserId,
    PostId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    PostId,
    UserId,
    ParentId,
    Text,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    RecipientId,
    ActorId,
    Kind,
    PostId,
    Read,
    CreatedAt,
}
