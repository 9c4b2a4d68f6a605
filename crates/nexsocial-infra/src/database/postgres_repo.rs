//! PostgreSQL repositories for users, profiles, posts and upload records.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, Condition, DbConn, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use nexsocial_core::domain::{
    MediaObject, Page, PageRequest, Post, PostFilter, PostStats, Profile, User,
};
use nexsocial_core::error::RepoError;
use nexsocial_core::ports::{MediaRepository, PostRepository, ProfileRepository, UserRepository};

use super::entity::{comment, follow, like, media_object, post, profile, saved_post, user};
use super::mask_email;
use super::postgres_base::{PostgresBaseRepository, fetch_page, map_db_err};

pub type PostgresUserRepository = PostgresBaseRepository<user::Entity>;
pub type PostgresProfileRepository = PostgresBaseRepository<profile::Entity>;
pub type PostgresPostRepository = PostgresBaseRepository<post::Entity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.map(Into::into))
    }

    async fn create_with_profile(
        &self,
        user: User,
        profile: Profile,
    ) -> Result<(User, Profile), RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        user::Entity::insert(user::ActiveModel::from(user.clone()))
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;
        profile::Entity::insert(profile::ActiveModel::from(profile.clone()))
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        tracing::debug!(user_id = %user.id, "User and profile stored");
        Ok((user, profile))
    }
}

/// `%query%` with LIKE wildcards in the query escaped.
fn contains_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, RepoError> {
        let found = profile::Entity::find()
            .filter(profile::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.map(Into::into))
    }

    async fn find_many(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, RepoError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = profile::Entity::find()
            .filter(profile::Column::UserId.is_in(user_ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.into_iter().map(Into::into).collect())
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Profile>, RepoError> {
        let pattern = contains_pattern(query);
        let select = profile::Entity::find()
            .filter(
                Condition::any()
                    .add(Expr::col(profile::Column::Username).ilike(pattern.clone()))
                    .add(Expr::col(profile::Column::Name).ilike(pattern)),
            )
            .order_by_asc(profile::Column::Username);

        Ok(fetch_page(&self.db, select, page).await?.map(Into::into))
    }
}

/// `post_id -> count` for one edge table.
async fn count_by_post<E, C>(
    db: &sea_orm::DbConn,
    column: C,
    post_ids: &[Uuid],
) -> Result<HashMap<Uuid, u64>, RepoError>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let rows: Vec<(Uuid, i64)> = E::find()
        .select_only()
        .column(column)
        .column_as(Expr::col(column).count(), "count")
        .filter(column.is_in(post_ids.iter().copied()))
        .group_by(column)
        .into_tuple()
        .all(db)
        .await
        .map_err(map_db_err)?;

    Ok(rows
        .into_iter()
        .map(|(id, count)| (id, count.max(0) as u64))
        .collect())
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn list(&self, filter: PostFilter, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let mut select = post::Entity::find();
        if let Some(kind) = filter.kind {
            select = select.filter(post::Column::Kind.eq(kind.as_str()));
        }
        if let Some(author_id) = filter.author_id {
            select = select.filter(post::Column::UserId.eq(author_id));
        }
        let select = select
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id);

        Ok(fetch_page(&self.db, select, page).await?.map(Into::into))
    }

    async fn feed(&self, viewer_id: Uuid, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let followed = Query::select()
            .column(follow::Column::FolloweeId)
            .from(follow::Entity)
            .and_where(follow::Column::FollowerId.eq(viewer_id))
            .to_owned();

        let select = post::Entity::find()
            .filter(
                Condition::any()
                    .add(post::Column::UserId.eq(viewer_id))
                    .add(post::Column::UserId.in_subquery(followed)),
            )
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id);

        Ok(fetch_page(&self.db, select, page).await?.map(Into::into))
    }

    async fn explore(&self, page: PageRequest) -> Result<Page<Post>, RepoError> {
        let select = post::Entity::find().order_by(Expr::cust("RANDOM()"), Order::Asc);
        Ok(fetch_page(&self.db, select, page).await?.map(Into::into))
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        post::Entity::find()
            .filter(post::Column::UserId.eq(user_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn media_in_use(&self, media_key: &str) -> Result<bool, RepoError> {
        let uses = post::Entity::find()
            .filter(post::Column::MediaKey.eq(media_key))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(uses > 0)
    }

    async fn stats(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, PostStats>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let likes = count_by_post::<like::Entity, _>(&self.db, like::Column::PostId, post_ids).await?;
        let comments =
            count_by_post::<comment::Entity, _>(&self.db, comment::Column::PostId, post_ids).await?;
        let saves =
            count_by_post::<saved_post::Entity, _>(&self.db, saved_post::Column::PostId, post_ids)
                .await?;

        Ok(post_ids
            .iter()
            .map(|id| {
                let stats = PostStats {
                    likes: likes.get(id).copied().unwrap_or(0),
                    comments: comments.get(id).copied().unwrap_or(0),
                    saves: saves.get(id).copied().unwrap_or(0),
                };
                (*id, stats)
            })
            .collect())
    }
}

pub struct PostgresMediaRepository {
    db: DbConn,
}

impl PostgresMediaRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MediaRepository for PostgresMediaRepository {
    async fn record(&self, media: MediaObject) -> Result<MediaObject, RepoError> {
        media_object::Entity::insert(media_object::ActiveModel::from(media.clone()))
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(media)
    }

    async fn find(&self, key: &str) -> Result<Option<MediaObject>, RepoError> {
        let found = media_object::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(found.map(Into::into))
    }

    async fn remove(&self, key: &str) -> Result<bool, RepoError> {
        let result = media_object::Entity::delete_by_id(key.to_string())
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("ali"), "%ali%");
        assert_eq!(contains_pattern("a_b%"), "%a\\_b\\%%");
    }
}
