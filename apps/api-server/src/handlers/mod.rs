//! HTTP handlers and route configuration.

mod auth;
mod health;
mod mapping;
mod media;
mod notifications;
mod posts;
mod users;

use actix_web::web;

use crate::middleware::error::{json_error_handler, path_error_handler, query_error_handler};
#[cfg(feature = "rate-limit")]
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(
            web::scope("/api")
                // Public routes
                .route("/health/", web::get().to(health::health_check))
                // Auth routes
                .service(
                    web::scope("/auth")
                        .route("/register/", web::post().to(auth::register))
                        .service(login_resource())
                        .route("/logout/", web::post().to(auth::logout))
                        .route("/me/", web::get().to(auth::me)),
                )
                // Profiles and the social graph; fixed segments before `{username}`
                .service(
                    web::scope("/users")
                        .route("/", web::get().to(users::search))
                        .route("/blocked/", web::get().to(users::blocked))
                        .service(
                            web::resource("/follow/{username}/")
                                .route(web::post().to(users::follow))
                                .route(web::delete().to(users::unfollow)),
                        )
                        .service(
                            web::resource("/block/{username}/")
                                .route(web::post().to(users::block))
                                .route(web::delete().to(users::unblock)),
                        )
                        .service(
                            web::resource("/{username}/")
                                .route(web::get().to(users::get_profile))
                                .route(web::put().to(users::update_profile)),
                        )
                        .route("/{username}/followers/", web::get().to(users::followers))
                        .route("/{username}/following/", web::get().to(users::following)),
                )
                // Posts and interactions; fixed segments before `{id}`
                .service(
                    web::scope("/posts")
                        .route("/", web::get().to(posts::list))
                        .route("/feed/", web::get().to(posts::feed))
                        .route("/explore/", web::get().to(posts::explore))
                        .route("/create/", web::post().to(posts::create))
                        .route("/comments/{id}/reply/", web::post().to(posts::reply))
                        .route("/comments/{id}/replies/", web::get().to(posts::replies))
                        .service(
                            web::resource("/{id}/")
                                .route(web::get().to(posts::get))
                                .route(web::delete().to(posts::delete)),
                        )
                        .service(
                            web::resource("/{id}/like/")
                                .route(web::post().to(posts::like))
                                .route(web::delete().to(posts::unlike)),
                        )
                        .service(
                            web::resource("/{id}/save/")
                                .route(web::post().to(posts::save))
                                .route(web::delete().to(posts::unsave)),
                        )
                        .route("/{id}/comments/", web::get().to(posts::comments))
                        .route("/{id}/comment/", web::post().to(posts::comment)),
                )
                .route("/media/upload/", web::post().to(media::upload))
                .service(
                    web::scope("/notifications")
                        .route("/", web::get().to(notifications::list))
                        .route("/read/", web::post().to(notifications::mark_read)),
                ),
        )
        .route("/media/{key}", web::get().to(media::serve));
}

#[cfg(feature = "rate-limit")]
fn login_resource() -> impl actix_web::dev::HttpServiceFactory {
    web::resource("/login/")
        .wrap(RateLimitMiddleware::new("login"))
        .route(web::post().to(auth::login))
}

#[cfg(not(feature = "rate-limit"))]
fn login_resource() -> impl actix_web::dev::HttpServiceFactory {
    web::resource("/login/").route(web::post().to(auth::login))
}
