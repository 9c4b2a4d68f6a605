//! Notification entity.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use nexsocial_core::domain::Notification;
use nexsocial_core::error::RepoError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub kind: String,
    pub post_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Notification {
    type Error = RepoError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            recipient_id: model.recipient_id,
            actor_id: model.actor_id,
            kind: model.kind.parse().map_err(RepoError::Query)?,
            post_id: model.post_id,
            read: model.read,
            created_at: model.created_at.into(),
        })
    }
}

impl From<Notification> for ActiveModel {
    fn from(n: Notification) -> Self {
        Self {
            id: Set(n.id),
            recipient_id: Set(n.recipient_id),
            actor_id: Set(n.actor_id),
            kind: Set(n.kind.as_str().to_string()),
            post_id: Set(n.post_id),
            read: Set(n.read),
            created_at: Set(n.created_at.into()),
        }
    }
}
