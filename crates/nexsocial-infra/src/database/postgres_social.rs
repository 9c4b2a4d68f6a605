//! PostgreSQL repositories for follow/block edges, engagement and notifications.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DbConn, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use nexsocial_core::domain::{Comment, Notification, Page, PageRequest};
use nexsocial_core::error::RepoError;
use nexsocial_core::ports::{EngagementRepository, NotificationRepository, SocialGraphRepository};

use super::entity::{block, comment, follow, like, notification, saved_post};
use super::postgres_base::{fetch_page, map_db_err};

pub struct PostgresSocialGraphRepository {
    db: DbConn,
}

impl PostgresSocialGraphRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SocialGraphRepository for PostgresSocialGraphRepository {
    async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let edge = follow::ActiveModel {
            follower_id: Set(follower_id),
            followee_id: Set(followee_id),
            created_at: Set(Utc::now().into()),
        };
        let inserted = follow::Entity::insert(edge)
            .on_conflict(
                OnConflict::columns([follow::Column::FollowerId, follow::Column::FolloweeId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(inserted > 0)
    }

    async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let result = follow::Entity::delete_by_id((follower_id, followee_id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let found = follow::Entity::find_by_id((follower_id, followee_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.is_some())
    }

    async fn followers(&self, user_id: Uuid, page: PageRequest) -> Result<Page<Uuid>, RepoError> {
        let select = follow::Entity::find()
            .filter(follow::Column::FolloweeId.eq(user_id))
            .order_by_desc(follow::Column::CreatedAt);
        Ok(fetch_page(&self.db, select, page)
            .await?
            .map(|edge| edge.follower_id))
    }

    async fn following(&self, user_id: Uuid, page: PageRequest) -> Result<Page<Uuid>, RepoError> {
        let select = follow::Entity::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .order_by_desc(follow::Column::CreatedAt);
        Ok(fetch_page(&self.db, select, page)
            .await?
            .map(|edge| edge.followee_id))
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<(u64, u64), RepoError> {
        let followers = follow::Entity::find()
            .filter(follow::Column::FolloweeId.eq(user_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;
        let following = follow::Entity::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok((followers, following))
    }

    async fn block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let edge = block::ActiveModel {
            blocker_id: Set(blocker_id),
            blocked_id: Set(blocked_id),
            created_at: Set(Utc::now().into()),
        };
        let inserted = block::Entity::insert(edge)
            .on_conflict(
                OnConflict::columns([block::Column::BlockerId, block::Column::BlockedId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;

        let removed = follow::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(follow::Column::FollowerId.eq(blocker_id))
                            .add(follow::Column::FolloweeId.eq(blocked_id)),
                    )
                    .add(
                        Condition::all()
                            .add(follow::Column::FollowerId.eq(blocked_id))
                            .add(follow::Column::FolloweeId.eq(blocker_id)),
                    ),
            )
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        tracing::debug!(
            blocker = %blocker_id,
            blocked = %blocked_id,
            follows_removed = removed.rows_affected,
            "Block stored"
        );
        Ok(inserted > 0)
    }

    async fn unblock(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError> {
        let result = block::Entity::delete_by_id((blocker_id, blocked_id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, RepoError> {
        let found = block::Entity::find_by_id((blocker_id, blocked_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.is_some())
    }

    async fn blocked_by(&self, blocker_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let edges = block::Entity::find()
            .filter(block::Column::BlockerId.eq(blocker_id))
            .order_by_desc(block::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(edges.into_iter().map(|edge| edge.blocked_id).collect())
    }
}

pub struct PostgresEngagementRepository {
    db: DbConn,
}

impl PostgresEngagementRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EngagementRepository for PostgresEngagementRepository {
    async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let edge = like::ActiveModel {
            user_id: Set(user_id),
            post_id: Set(post_id),
            created_at: Set(Utc::now().into()),
        };
        let inserted = like::Entity::insert(edge)
            .on_conflict(
                OnConflict::columns([like::Column::UserId, like::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(inserted > 0)
    }

    async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let result = like::Entity::delete_by_id((user_id, post_id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let found = like::Entity::find_by_id((user_id, post_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.is_some())
    }

    async fn save_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let edge = saved_post::ActiveModel {
            user_id: Set(user_id),
            post_id: Set(post_id),
            created_at: Set(Utc::now().into()),
        };
        let inserted = saved_post::Entity::insert(edge)
            .on_conflict(
                OnConflict::columns([saved_post::Column::UserId, saved_post::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(inserted > 0)
    }

    async fn unsave_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let result = saved_post::Entity::delete_by_id((user_id, post_id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn add_comment(&self, comment: Comment) -> Result<Comment, RepoError> {
        let active: comment::ActiveModel = comment.into();
        let model = comment::Entity::insert(active)
            .exec_with_returning(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let found = comment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.map(Into::into))
    }

    async fn list_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError> {
        let select = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::ParentId.is_null())
            .order_by_desc(comment::Column::CreatedAt);
        Ok(fetch_page(&self.db, select, page).await?.map(Into::into))
    }

    async fn list_replies(&self, comment_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let replies = comment::Entity::find()
            .filter(comment::Column::ParentId.eq(comment_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(replies.into_iter().map(Into::into).collect())
    }

    async fn reply_counts(&self, comment_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, i64)> = comment::Entity::find()
            .select_only()
            .column(comment::Column::ParentId)
            .column_as(Expr::col(comment::Column::Id).count(), "count")
            .filter(comment::Column::ParentId.is_in(comment_ids.iter().copied()))
            .group_by(comment::Column::ParentId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u64))
            .collect())
    }
}

pub struct PostgresNotificationRepository {
    db: DbConn,
}

impl PostgresNotificationRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn save(&self, notification: Notification) -> Result<Notification, RepoError> {
        let active: notification::ActiveModel = notification.into();
        let model = notification::Entity::insert(active)
            .exec_with_returning(&self.db)
            .await
            .map_err(map_db_err)?;
        model.try_into()
    }

    async fn list_for(
        &self,
        recipient_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Notification>, RepoError> {
        let select = notification::Entity::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .order_by_desc(notification::Column::CreatedAt);
        let page = fetch_page(&self.db, select, page).await?;

        let items = page
            .items
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, page.total, page.request))
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<u64, RepoError> {
        notification::Entity::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::Read.eq(false))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, RepoError> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::Read.eq(false))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn prune_read_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = notification::Entity::delete_many()
            .filter(notification::Column::Read.eq(true))
            .filter(notification::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }
}
