//! SeaORM entities and their mapping to domain types.

pub mod block;
pub mod comment;
pub mod follow;
pub mod like;
pub mod media_object;
pub mod notification;
pub mod post;
pub mod profile;
pub mod saved_post;
pub mod user;
