//! Schema migrations for the NexSocial Postgres database.

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_accounts;
mod m20250101_000002_create_social;
mod m20250101_000003_create_media;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_accounts::Migration),
            Box::new(m20250101_000002_create_social::Migration),
            Box::new(m20250101_000003_create_media::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use sea_orm_migration::sea_orm::{ConnectionTrait, Database, DatabaseConnection, ExecResult};

    use super::*;

    const ALICE: &str = "6f1c2a1e-8d3b-4b8e-9a57-0c1d2e3f4a5b";

    async fn migrated() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db.execute_unprepared(&format!(
            "INSERT INTO users (id, username, email, password_hash) \
             VALUES ('{ALICE}', 'alice', 'alice@example.com', 'hash')"
        ))
        .await
        .unwrap();
        db
    }

    async fn insert_post(
        db: &DatabaseConnection,
        id: &str,
        media_key: &str,
        kind: &str,
    ) -> Result<ExecResult, DbErr> {
        db.execute_unprepared(&format!(
            "INSERT INTO posts (id, user_id, media_key, kind) \
             VALUES ('{id}', '{ALICE}', '{media_key}', '{kind}')"
        ))
        .await
    }

    #[tokio::test]
    async fn test_every_post_kind_is_accepted() {
        let db = migrated().await;

        insert_post(&db, "p1", "a.jpg", "post").await.unwrap();
        insert_post(&db, "p2", "b.mp4", "reel").await.unwrap();
        insert_post(&db, "p3", "c.jpg", "carousel").await.unwrap();
        assert!(insert_post(&db, "p4", "d.jpg", "story").await.is_err());
    }

    #[tokio::test]
    async fn test_media_key_backs_one_post() {
        let db = migrated().await;

        insert_post(&db, "p1", "a.jpg", "post").await.unwrap();
        assert!(insert_post(&db, "p2", "a.jpg", "reel").await.is_err());
    }

    #[tokio::test]
    async fn test_media_objects_record_uploader() {
        let db = migrated().await;

        db.execute_unprepared(&format!(
            "INSERT INTO media_objects (\"key\", uploader_id, content_type, size) \
             VALUES ('a.jpg', '{ALICE}', 'image/jpeg', 12)"
        ))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_down_reverts_every_table() {
        let db = migrated().await;
        Migrator::down(&db, None).await.unwrap();

        let manager = SchemaManager::new(&db);
        for table in ["users", "profiles", "posts", "media_objects", "notifications"] {
            assert!(!manager.has_table(table).await.unwrap(), "{table} survived");
        }
    }
}
