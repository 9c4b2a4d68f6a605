//! Notification inbox.

use actix_web::{HttpRequest, HttpResponse, web};

use nexsocial_shared::dto::{MarkReadResponse, NotificationListResponse, PageQuery};

use super::mapping::{notification_response, page_request, paginated};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/notifications/
pub async fn list(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = page_request(query.page, query.page_size);
    let (notifications, unread_count) = state.notifications.list(identity.user_id, page).await?;

    Ok(HttpResponse::Ok().json(NotificationListResponse {
        unread_count,
        page: paginated(notifications, req.path(), notification_response),
    }))
}

/// POST /api/notifications/read/
pub async fn mark_read(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let marked = state.notifications.mark_all_read(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(MarkReadResponse { marked }))
}
