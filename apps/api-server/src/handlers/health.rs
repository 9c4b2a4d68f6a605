//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub database: &'static str,
    pub cache: &'static str,
    pub jobs: &'static str,
    pub queued_jobs: Option<usize>,
}

/// Health check endpoint - returns server status and the adapters in use.
///
/// GET /api/health/
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    #[cfg(feature = "postgres")]
    let status = match &state.db {
        Some(db) if !db.ping().await => "degraded",
        _ => "ok",
    };
    #[cfg(not(feature = "postgres"))]
    let status = "ok";

    let queued_jobs = state.jobs.stats().await.ok().map(|stats| stats.pending);

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: state.backends.database,
        cache: state.backends.cache,
        jobs: state.backends.jobs,
        queued_jobs,
    };

    if status == "ok" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
