//! Media upload and download.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use futures::StreamExt;

use nexsocial_shared::dto::MediaUploadResponse;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/media/upload/
///
/// The raw request body is the file; its `Content-Type` header decides the
/// stored extension. Reading stops one byte past the size limit so oversized
/// uploads are rejected without buffering them whole.
pub async fn upload(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    mut payload: web::Payload,
) -> AppResult<HttpResponse> {
    let limit = state.media.max_bytes() as usize;
    let mut bytes = Vec::new();

    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        let remaining = limit.saturating_add(1).saturating_sub(bytes.len());
        bytes.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
        if bytes.len() > limit {
            break;
        }
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let (stored, url) = state
        .media
        .upload(identity.user_id, content_type, bytes)
        .await?;

    Ok(HttpResponse::Created().json(MediaUploadResponse {
        key: stored.key,
        url,
        content_type: stored.content_type,
        size: stored.size,
    }))
}

/// GET /media/{key}
pub async fn serve(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let (stored, bytes) = state.media.fetch(&path).await?;

    Ok(HttpResponse::Ok()
        .content_type(stored.content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(bytes))
}
