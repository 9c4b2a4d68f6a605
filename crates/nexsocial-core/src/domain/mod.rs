//! Domain entities - the core business objects.

mod graph;
mod interaction;
mod media;
mod notification;
pub mod pagination;
mod post;
mod profile;
mod user;

pub use graph::{Block, Follow};
pub use interaction::{Comment, Like, SavedPost};
pub use media::MediaObject;
pub use notification::{Notification, NotificationKind};
pub use pagination::{Page, PageRequest};
pub use post::{Post, PostFilter, PostKind, PostStats};
pub use profile::{DEFAULT_PICTURE, FollowPermission, Profile, ProfileStats, ProfileUpdate};
pub use user::{MAX_FAILED_LOGINS, User};
