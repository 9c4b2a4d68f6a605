//! Rule services. Each one owns a slice of the business rules and talks to
//! storage only through the ports.

mod accounts;
pub mod display;
pub mod jobs;
mod media;
mod notifications;
mod posts;
mod social;
pub mod validation;

pub use accounts::{AccountService, RegisterInput, revoked_token_key};
pub use media::MediaService;
pub use notifications::{NotificationService, NotificationView};
pub use posts::{CommentView, CreatePostInput, EXPLORE_PAGE_SIZE, PostService, PostView};
pub use social::{ProfileView, SocialService};
