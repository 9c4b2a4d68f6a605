//! Post, like, save and comment handlers.

use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use nexsocial_core::services::{CreatePostInput, EXPLORE_PAGE_SIZE};
use nexsocial_shared::ApiResponse;
use nexsocial_shared::dto::{CommentRequest, CreatePostRequest, PageQuery, PostListQuery};

use super::mapping::{comment_response, page_request, paginated, post_kind, post_response};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/posts/?page=&page_size=&kind=&author=
pub async fn list(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PostListQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let kind = post_kind(query.kind.as_deref())?;
    let page = page_request(query.page, query.page_size);

    let posts = state.posts.list(kind, query.author.as_deref(), page).await?;
    Ok(HttpResponse::Ok().json(paginated(posts, req.path(), post_response)))
}

/// GET /api/posts/feed/
pub async fn feed(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = page_request(query.page, query.page_size);
    let posts = state.posts.feed(identity.user_id, page).await?;
    Ok(HttpResponse::Ok().json(paginated(posts, req.path(), post_response)))
}

/// GET /api/posts/explore/ - every post in random order, three per page by default.
pub async fn explore(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = page_request(query.page, query.page_size.or(Some(EXPLORE_PAGE_SIZE)));
    let posts = state.posts.explore(page).await?;
    Ok(HttpResponse::Ok().json(paginated(posts, req.path(), post_response)))
}

/// POST /api/posts/create/
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let input = CreatePostInput {
        description: req.description,
        media_key: req.media_key,
        kind: post_kind(req.kind.as_deref())?.unwrap_or_default(),
    };

    let view = state.posts.create(identity.user_id, input).await?;
    Ok(HttpResponse::Created().json(post_response(view)))
}

/// GET /api/posts/{id}/
pub async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let view = state.posts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post_response(view)))
}

/// DELETE /api/posts/{id}/
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.posts.delete(identity.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{id}/like/
pub async fn like(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    if state.posts.like(identity.user_id, path.into_inner()).await? {
        Ok(HttpResponse::Created().json(ApiResponse::message("Post liked")))
    } else {
        Ok(HttpResponse::Ok().json(ApiResponse::message("You already liked this post")))
    }
}

/// DELETE /api/posts/{id}/like/
pub async fn unlike(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.posts.unlike(identity.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{id}/save/
pub async fn save(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    if state.posts.save(identity.user_id, path.into_inner()).await? {
        Ok(HttpResponse::Created().json(ApiResponse::message("Post saved")))
    } else {
        Ok(HttpResponse::Ok().json(ApiResponse::message("You already saved this post")))
    }
}

/// DELETE /api/posts/{id}/save/
pub async fn unsave(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.posts.unsave(identity.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/posts/{id}/comments/
pub async fn comments(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = page_request(query.page, query.page_size);
    let comments = state.posts.list_comments(path.into_inner(), page).await?;
    Ok(HttpResponse::Ok().json(paginated(comments, req.path(), comment_response)))
}

/// POST /api/posts/{id}/comment/
pub async fn comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let view = state
        .posts
        .comment(identity.user_id, path.into_inner(), &body.text)
        .await?;
    Ok(HttpResponse::Created().json(comment_response(view)))
}

/// POST /api/posts/comments/{id}/reply/
pub async fn reply(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let view = state
        .posts
        .reply(identity.user_id, path.into_inner(), &body.text)
        .await?;
    Ok(HttpResponse::Created().json(comment_response(view)))
}

/// GET /api/posts/comments/{id}/replies/
pub async fn replies(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let replies: Vec<_> = state
        .posts
        .list_replies(path.into_inner())
        .await?
        .into_iter()
        .map(comment_response)
        .collect();
    Ok(HttpResponse::Ok().json(replies))
}
