//! End-to-end tests against the in-memory application.

use std::time::Duration;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use serde_json::{Value, json};

use api_server::handlers;
use api_server::observability::RequestIdMiddleware;
use api_server::state::AppState;

const PASSWORD: &str = "Str0ng!pass";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-bytes";

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data(web::Data::new($state))
                .configure(handlers::configure_routes),
        )
        .await
    };
}

/// Register `$username` and return its bearer token.
macro_rules! register {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register/")
            .set_json(json!({
                "username": $username,
                "email": format!("{}@example.com", $username),
                "password": PASSWORD,
                "password2": PASSWORD,
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["access_token"].as_str().unwrap().to_string()
    }};
}

/// Upload a PNG as `$token` and return the stored key.
macro_rules! upload {
    ($app:expr, $token:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/media/upload/")
            .insert_header(bearer(&$token))
            .insert_header((header::CONTENT_TYPE, "image/png"))
            .set_payload(PNG)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["key"].as_str().unwrap().to_string()
    }};
}

/// Create a post as `$token` and return its id.
macro_rules! create_post {
    ($app:expr, $token:expr) => {{
        let key = upload!($app, $token);
        let req = test::TestRequest::post()
            .uri("/api/posts/create/")
            .insert_header(bearer(&$token))
            .set_json(json!({ "description": "  sunset  ", "media_key": key }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["id"].as_str().unwrap().to_string()
    }};
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn login_body(username: &str, password: &str) -> Value {
    json!({ "username": username, "password": password })
}

#[actix_web::test]
async fn test_health_reports_memory_backends() {
    let app = app!(AppState::in_memory());

    let req = test::TestRequest::get().uri("/api/health/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "memory");
    assert_eq!(body["jobs"], "memory");
}

#[actix_web::test]
async fn test_register_login_me_and_logout() {
    let app = app!(AppState::in_memory());
    register!(app, "Alice");

    let req = test::TestRequest::post()
        .uri("/api/auth/login/")
        .set_json(login_body("alice", PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["username"], "alice");
    let token = body["access_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me/")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], "alice@example.com");

    let req = test::TestRequest::post()
        .uri("/api/auth/logout/")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/auth/me/")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_register_rejects_weak_password_and_duplicates() {
    let app = app!(AppState::in_memory());

    let req = test::TestRequest::post()
        .uri("/api/auth/register/")
        .set_json(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "short",
            "password2": "short",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    register!(app, "bob");
    let req = test::TestRequest::post()
        .uri("/api/auth/register/")
        .set_json(json!({
            "username": "bob",
            "email": "other@example.com",
            "password": PASSWORD,
            "password2": PASSWORD,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_repeated_failed_logins_lock_the_account() {
    let app = app!(AppState::in_memory());
    register!(app, "carol");

    let req = test::TestRequest::post()
        .uri("/api/auth/login/")
        .set_json(login_body("carol", "Wrong!pass1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Invalid credentials");

    for _ in 0..4 {
        let req = test::TestRequest::post()
            .uri("/api/auth/login/")
            .set_json(login_body("carol", "Wrong!pass1"))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/login/")
        .set_json(login_body("carol", PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[cfg(feature = "rate-limit")]
#[actix_web::test]
async fn test_login_is_rate_limited() {
    use std::sync::Arc;

    use nexsocial_infra::{InMemoryRateLimiter, RateLimitConfig};

    let limiter = Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: 2,
        window: Duration::from_secs(60),
    }));
    let app = app!(AppState::in_memory().with_login_limiter(limiter));

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/auth/login/")
            .set_json(login_body("nobody", PASSWORD))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/login/")
        .set_json(login_body("nobody", PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key(header::RETRY_AFTER));
}

#[actix_web::test]
async fn test_profile_requires_auth_and_only_owner_edits() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let req = test::TestRequest::get().uri("/api/users/alice/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/users/alice/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "alice");
    assert_eq!(body["is_self"], true);

    let req = test::TestRequest::put()
        .uri("/api/users/alice/")
        .insert_header(bearer(&bob))
        .set_json(json!({ "name": "Not Alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri("/api/users/alice/")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Alice Liddell", "bio": "Curiouser" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Alice Liddell");
    assert_eq!(body["bio"], "Curiouser");
}

#[actix_web::test]
async fn test_follow_rules() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/users/follow/alice/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/users/follow/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/users/follow/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri("/api/users/bob/followers/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["username"], "alice");

    let req = test::TestRequest::get()
        .uri("/api/users/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["followers_count"], 1);
    assert_eq!(body["is_following"], true);

    let req = test::TestRequest::delete()
        .uri("/api/users/follow/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::delete()
        .uri("/api/users/follow/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // bob stops accepting followers
    let req = test::TestRequest::put()
        .uri("/api/users/bob/")
        .insert_header(bearer(&bob))
        .set_json(json!({ "who_can_follow": "none" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/users/follow/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_block_hides_profile_and_prevents_follow() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/users/follow/alice/")
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/users/block/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/users/blocked/")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!(["bob"]));

    let req = test::TestRequest::get()
        .uri("/api/users/alice/")
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // the existing follow edge went away with the block
    let req = test::TestRequest::get()
        .uri("/api/users/alice/followers/")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 0);

    let req = test::TestRequest::post()
        .uri("/api/users/follow/alice/")
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri("/api/users/block/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/users/alice/")
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_post_lifecycle_with_likes_saves_and_comments() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    let post_id = create_post!(app, alice);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}/"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["author"], "alice");
    assert_eq!(body["description"], "sunset");
    assert_eq!(body["kind"], "post");

    let req = test::TestRequest::get()
        .uri("/api/posts/?author=alice")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);

    let req = test::TestRequest::get()
        .uri("/api/posts/?kind=reel")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 0);

    // like twice, then unlike twice
    let like_uri = format!("/api/posts/{post_id}/like/");
    let req = test::TestRequest::post()
        .uri(&like_uri)
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    let req = test::TestRequest::post()
        .uri(&like_uri)
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}/"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["like_count"], 1);

    let req = test::TestRequest::delete()
        .uri(&like_uri)
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::delete()
        .uri(&like_uri)
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let save_uri = format!("/api/posts/{post_id}/save/");
    let req = test::TestRequest::post()
        .uri(&save_uri)
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    let req = test::TestRequest::post()
        .uri(&save_uri)
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // comment and a reply
    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{post_id}/comment/"))
        .insert_header(bearer(&bob))
        .set_json(json!({ "text": "Lovely" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let comment: Value = test::read_body_json(resp).await;
    let comment_id = comment["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/comments/{comment_id}/reply/"))
        .insert_header(bearer(&alice))
        .set_json(json!({ "text": "Thanks!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let reply: Value = test::read_body_json(resp).await;
    assert_eq!(reply["parent_id"], comment_id.as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}/comments/"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["reply_count"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/comments/{comment_id}/replies/"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["author"], "alice");

    // only the owner deletes
    let post_uri = format!("/api/posts/{post_id}/");
    let req = test::TestRequest::delete()
        .uri(&post_uri)
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    let req = test::TestRequest::delete()
        .uri(&post_uri)
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri(&post_uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_feed_contains_own_and_followed_posts() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    let carol = register!(app, "carol");

    create_post!(app, alice);
    create_post!(app, bob);
    create_post!(app, carol);

    let req = test::TestRequest::post()
        .uri("/api/users/follow/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/posts/feed/")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 2);
    let authors: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["author"].as_str())
        .collect();
    assert!(authors.contains(&"alice"));
    assert!(authors.contains(&"bob"));
    assert!(!authors.contains(&"carol"));
}

#[actix_web::test]
async fn test_create_post_requires_uploaded_media() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/posts/create/")
        .insert_header(bearer(&alice))
        .set_json(json!({ "media_key": "00000000-0000-0000-0000-000000000000.png" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_uploaded_media_is_served() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let key = upload!(app, alice);
    assert!(key.ends_with(".png"));

    let req = test::TestRequest::get()
        .uri(&format!("/media/{key}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let body = test::read_body(resp).await;
    assert_eq!(body.as_ref(), PNG);
}

#[actix_web::test]
async fn test_media_upload_rejections() {
    let app = app!(AppState::in_memory().with_max_upload_bytes(8));
    let alice = register!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/media/upload/")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("hello")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let req = test::TestRequest::post()
        .uri("/api/media/upload/")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, "image/png"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/media/upload/")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, "image/png"))
        .set_payload(PNG)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let req = test::TestRequest::post()
        .uri("/api/media/upload/")
        .insert_header((header::CONTENT_TYPE, "image/png"))
        .set_payload(PNG)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_follow_notification_is_delivered_by_workers() {
    let state = AppState::in_memory();
    api_server::background::workers::start(&state).await.unwrap();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/users/follow/bob/")
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let mut body = Value::Null;
    for _ in 0..50 {
        let req = test::TestRequest::get()
            .uri("/api/notifications/")
            .insert_header(bearer(&bob))
            .to_request();
        body = test::call_and_read_body_json(&app, req).await;
        if body["count"] == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(body["count"], 1);
    assert_eq!(body["unread_count"], 1);
    assert_eq!(body["results"][0]["kind"], "follow");
    assert_eq!(body["results"][0]["actor"], "alice");

    let req = test::TestRequest::post()
        .uri("/api/notifications/read/")
        .insert_header(bearer(&bob))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["marked"], 1);

    let req = test::TestRequest::get()
        .uri("/api/notifications/")
        .insert_header(bearer(&bob))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["unread_count"], 0);
}

#[actix_web::test]
async fn test_search_is_paginated() {
    let app = app!(AppState::in_memory());
    for name in ["pager1", "pager2", "pager3"] {
        register!(app, name);
    }

    let req = test::TestRequest::get()
        .uri("/api/users/?search=pager&page_size=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["next"], "/api/users/?page=2&page_size=2");
    assert!(body["previous"].is_null());

    let req = test::TestRequest::get()
        .uri("/api/users/?search=pager&page=2&page_size=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["results"][0]["username"], "pager3");
    assert!(body["next"].is_null());
}

#[actix_web::test]
async fn test_errors_carry_request_id() {
    let app = app!(AppState::in_memory());

    let req = test::TestRequest::get()
        .uri("/api/auth/me/")
        .insert_header(("x-request-id", "trace-me-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "trace-me-42");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["request_id"], "trace-me-42");
    assert_eq!(body["status"], 401);
}

#[actix_web::test]
async fn test_extractor_failures_map_to_problem_responses() {
    let app = app!(AppState::in_memory());

    let req = test::TestRequest::get()
        .uri("/api/posts/not-a-uuid/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["request_id"].is_string());

    let req = test::TestRequest::post()
        .uri("/api/auth/login/")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{\"username\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::get()
        .uri("/api/posts/?page=zero")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_carousel_posts_are_created_and_filtered() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let key = upload!(app, alice);

    let req = test::TestRequest::post()
        .uri("/api/posts/create/")
        .insert_header(bearer(&alice))
        .set_json(json!({ "media_key": key, "kind": "carousel" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "carousel");

    let req = test::TestRequest::get()
        .uri("/api/posts/?kind=carousel")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["media_key"], key.as_str());
}

#[actix_web::test]
async fn test_huge_and_past_the_end_pages_are_empty() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    create_post!(app, alice);

    for uri in [
        "/api/posts/?page=18446744073709551615&page_size=100",
        "/api/posts/?page=9223372036854775807",
        "/api/posts/?page=2",
        "/api/users/?search=ali&page=18446744073709551615",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], 1, "{uri}");
        assert_eq!(body["results"].as_array().map(Vec::len), Some(0), "{uri}");
        assert!(body["next"].is_null(), "{uri}");
    }

    let req = test::TestRequest::get()
        .uri("/api/posts/feed/?page=18446744073709551615")
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_media_key_cannot_be_taken_or_reused() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    let key = upload!(app, alice);

    let req = test::TestRequest::post()
        .uri("/api/posts/create/")
        .insert_header(bearer(&bob))
        .set_json(json!({ "media_key": key }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/posts/create/")
        .insert_header(bearer(&alice))
        .set_json(json!({ "media_key": key }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/api/posts/create/")
        .insert_header(bearer(&alice))
        .set_json(json!({ "media_key": key, "kind": "reel" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // bob's failed attempt left alice's post and media untouched
    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{}/", post["id"].as_str().unwrap()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["author"], "alice");
    let req = test::TestRequest::get()
        .uri(&format!("/media/{key}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_explore_lists_every_post_three_at_a_time() {
    let app = app!(AppState::in_memory());
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    for token in [&alice, &alice, &bob, &bob] {
        create_post!(app, token);
    }

    let req = test::TestRequest::get().uri("/api/posts/explore/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 4);
    assert_eq!(body["page_size"], 3);
    assert_eq!(body["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["next"], "/api/posts/explore/?page=2&page_size=3");

    let req = test::TestRequest::get()
        .uri("/api/posts/explore/?page=1&page_size=10")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["results"].as_array().map(Vec::len), Some(4));
}

#[actix_web::test]
async fn test_route_words_cannot_be_usernames() {
    let app = app!(AppState::in_memory());

    let req = test::TestRequest::post()
        .uri("/api/auth/register/")
        .set_json(json!({
            "username": "blocked",
            "email": "blocked@example.com",
            "password": PASSWORD,
            "password2": PASSWORD,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("reserved"));
}
