//! Authentication handlers.

use actix_web::{HttpResponse, web};

use nexsocial_core::services::RegisterInput;
use nexsocial_shared::ApiResponse;
use nexsocial_shared::dto::{LoginRequest, RegisterRequest};

use super::mapping::{auth_response, user_response};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/auth/register/
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let (user, token) = state
        .accounts
        .register(RegisterInput {
            username: req.username,
            email: req.email,
            password: req.password,
            password2: req.password2,
        })
        .await?;

    Ok(HttpResponse::Created().json(auth_response(&user, token)))
}

/// POST /api/auth/login/
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let (user, token) = state.accounts.login(&req.username, &req.password).await?;

    Ok(HttpResponse::Ok().json(auth_response(&user, token)))
}

/// POST /api/auth/logout/
pub async fn logout(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    state.accounts.logout(&identity.claims).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Successfully logged out")))
}

/// GET /api/auth/me/
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state.accounts.current_user(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(user_response(&user)))
}
