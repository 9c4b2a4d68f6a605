//! Profile, follow and block handlers.

use actix_web::{HttpRequest, HttpResponse, web};

use nexsocial_shared::ApiResponse;
use nexsocial_shared::dto::{PageQuery, SearchQuery, UpdateProfileRequest};

use super::mapping::{page_request, paginated, profile_response, profile_summary, profile_update};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/users/?search=
pub async fn search(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let page = page_request(query.page, query.page_size);
    let profiles = state
        .social
        .search(query.search.as_deref().unwrap_or_default(), page)
        .await?;

    Ok(HttpResponse::Ok().json(paginated(profiles, req.path(), profile_summary)))
}

/// GET /api/users/blocked/
pub async fn blocked(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let usernames: Vec<String> = state
        .social
        .blocked_users(identity.user_id)
        .await?
        .into_iter()
        .map(|p| p.username)
        .collect();

    Ok(HttpResponse::Ok().json(usernames))
}

/// GET /api/users/{username}/
pub async fn get_profile(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let view = state.social.get_profile(identity.user_id, &path).await?;
    Ok(HttpResponse::Ok().json(profile_response(view)))
}

/// PUT /api/users/{username}/
pub async fn update_profile(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let update = profile_update(body.into_inner())?;
    let view = state
        .social
        .update_profile(identity.user_id, &path, update)
        .await?;
    Ok(HttpResponse::Ok().json(profile_response(view)))
}

/// GET /api/users/{username}/followers/
pub async fn followers(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = page_request(query.page, query.page_size);
    let profiles = state.social.followers(&path, page).await?;
    Ok(HttpResponse::Ok().json(paginated(profiles, req.path(), profile_summary)))
}

/// GET /api/users/{username}/following/
pub async fn following(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = page_request(query.page, query.page_size);
    let profiles = state.social.following(&path, page).await?;
    Ok(HttpResponse::Ok().json(paginated(profiles, req.path(), profile_summary)))
}

/// POST /api/users/follow/{username}/
pub async fn follow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let target = state.social.follow(identity.user_id, &path).await?;
    Ok(HttpResponse::Created().json(ApiResponse::message(format!(
        "You are now following {}",
        target.username
    ))))
}

/// DELETE /api/users/follow/{username}/
pub async fn unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.social.unfollow(identity.user_id, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/users/block/{username}/
pub async fn block(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let target = state.social.block(identity.user_id, &path).await?;
    Ok(HttpResponse::Created().json(ApiResponse::message(format!(
        "You have blocked {}",
        target.username
    ))))
}

/// DELETE /api/users/block/{username}/
pub async fn unblock(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.social.unblock(identity.user_id, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}
