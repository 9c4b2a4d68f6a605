//! Profile entity. Keyed by the owning user's id.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use nexsocial_core::domain::Profile;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub name: String,
    pub bio: Option<String>,
    pub picture: String,
    pub location: Option<String>,
    pub website: Option<String>,
    pub is_private: bool,
    pub who_can_follow: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
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

impl From<Model> for Profile {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            username: model.username,
            name: model.name,
            bio: model.bio,
            picture: model.picture,
            location: model.location,
            website: model.website,
            is_private: model.is_private,
            who_can_follow: model.who_can_follow.parse().unwrap_or_default(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<Profile> for ActiveModel {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: Set(profile.user_id),
            username: Set(profile.username),
            name: Set(profile.name),
            bio: Set(profile.bio),
            picture: Set(profile.picture),
            location: Set(profile.location),
            website: Set(profile.website),
            is_private: Set(profile.is_private),
            who_can_follow: Set(profile.who_can_follow.as_str().to_string()),
            created_at: Set(profile.created_at.into()),
            updated_at: Set(profile.updated_at.into()),
        }
    }
}
