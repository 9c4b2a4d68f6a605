//! Upload record: which user a stored media key belongs to.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use nexsocial_core::domain::MediaObject;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "media_objects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub uploader_id: Uuid,
    pub content_type: String,
    pub size: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UploaderId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MediaObject {
    fn from(model: Model) -> Self {
        Self {
            key: model.key,
            uploader_id: model.uploader_id,
            content_type: model.content_type,
            size: model.size.max(0) as u64,
            created_at: model.created_at.into(),
        }
    }
}

impl From<MediaObject> for ActiveModel {
    fn from(media: MediaObject) -> Self {
        Self {
            key: Set(media.key),
            uploader_id: Set(media.uploader_id),
            content_type: Set(media.content_type),
            size: Set(i64::try_from(media.size).unwrap_or(i64::MAX)),
            created_at: Set(media.created_at.into()),
        }
    }
}
