use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DbConn, DbErr, EntityTrait, FromQueryResult,
    IntoActiveModel, PaginatorTrait, PrimaryKeyTrait, RuntimeErr, Select, SqlErr,
};

use nexsocial_core::domain::{Page, PageRequest};
use nexsocial_core::error::RepoError;
use nexsocial_core::ports::BaseRepository;

/// Generic PostgreSQL repository for single-key entities.
pub struct PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub(crate) db: DbConn,
    _entity: PhantomData<E>,
}

impl<E> PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

/// SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

/// Constraint violations keep their kind; everything else is `Query`
/// or `Connection`.
pub(crate) fn map_db_err(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => RepoError::Unique(msg),
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => RepoError::ForeignKey(msg),
        _ => {
            if let Some(msg) = check_violation(&err) {
                return RepoError::Check(msg);
            }
            match err {
                DbErr::Conn(e) => RepoError::Connection(e.to_string()),
                DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
                other => RepoError::Query(other.to_string()),
            }
        }
    }
}

fn check_violation(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db))
            if db.code().as_deref() == Some(CHECK_VIOLATION) =>
        {
            Some(db.message().to_string())
        }
        other => {
            let text = other.to_string();
            text.contains("violates check constraint").then_some(text)
        }
    }
}

/// Run `select` as one page, counting the full result set.
pub(crate) async fn fetch_page<E>(
    db: &DbConn,
    select: Select<E>,
    page: PageRequest,
) -> Result<Page<E::Model>, RepoError>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    let paginator = select.paginate(db, page.limit());
    let total = paginator.num_items().await.map_err(map_db_err)?;
    let items = paginator
        .fetch_page(page.page - 1)
        .await
        .map_err(map_db_err)?;
    Ok(Page::new(items, total, page))
}

#[async_trait]
impl<E, T, ID> BaseRepository<T, ID> for PostgresBaseRepository<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + Send,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = ID>,
    ID: Send + Sync + Into<sea_orm::Value> + Clone + Copy + 'static,
    T: From<E::Model> + Into<E::ActiveModel> + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError> {
        let found = E::find_by_id(id).one(&self.db).await.map_err(map_db_err)?;
        Ok(found.map(Into::into))
    }

    /// Update the row if it exists, insert it otherwise.
    async fn save(&self, entity: T) -> Result<T, RepoError> {
        let active: E::ActiveModel = entity.into();

        let model = match active.clone().update(&self.db).await {
            Ok(model) => model,
            Err(DbErr::RecordNotUpdated) => active.insert(&self.db).await.map_err(map_db_err)?,
            Err(e) => return Err(map_db_err(e)),
        };
        Ok(model.into())
    }

    async fn delete(&self, id: ID) -> Result<(), RepoError> {
        let result = E::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sea_orm::sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct ServerError {
        code: &'static str,
        message: &'static str,
    }

    impl fmt::Display for ServerError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for ServerError {}

    impl DatabaseError for ServerError {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::CheckViolation
        }
    }

    fn server_error(code: &'static str, message: &'static str) -> DbErr {
        DbErr::Exec(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(
            Box::new(ServerError { code, message }),
        )))
    }

    #[test]
    fn test_check_violation_by_sqlstate() {
        let err = server_error("23514", "new row violates check constraint \"chk_posts_kind\"");
        assert!(matches!(map_db_err(err), RepoError::Check(msg) if msg.contains("chk_posts_kind")));
    }

    #[test]
    fn test_check_violation_by_message() {
        let err = DbErr::Query(RuntimeErr::Internal(
            "new row for relation \"follows\" violates check constraint \"chk_follows_not_self\""
                .to_string(),
        ));
        assert!(matches!(map_db_err(err), RepoError::Check(_)));
    }

    #[test]
    fn test_other_failures_are_not_constraints() {
        let err = server_error("42P01", "relation \"posts\" does not exist");
        assert!(matches!(map_db_err(err), RepoError::Query(_)));

        let err = DbErr::Conn(RuntimeErr::Internal("refused".to_string()));
        assert!(matches!(map_db_err(err), RepoError::Connection(_)));
    }
}
