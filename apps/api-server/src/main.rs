//! # NexSocial API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

use api_server::config::AppConfig;
use api_server::observability::RequestIdMiddleware;
use api_server::state::AppState;
use api_server::telemetry::{init_telemetry, shutdown_telemetry};
use api_server::{background, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    init_telemetry(&config.telemetry);

    tracing::info!(
        "Starting NexSocial API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).await?;

    background::workers::start(&state)
        .await
        .map_err(std::io::Error::other)?;

    #[cfg(feature = "scheduler")]
    let mut scheduler = {
        let scheduler = background::scheduler::Scheduler::new(config.scheduler.clone())
            .await
            .map_err(std::io::Error::other)?;
        scheduler
            .register_maintenance(state.jobs.clone())
            .await
            .map_err(std::io::Error::other)?;
        scheduler.start().await.map_err(std::io::Error::other)?;
        scheduler
    };

    let server_state = state.clone();
    let result = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(server_state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    #[cfg(feature = "scheduler")]
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
    }

    tracing::info!("Server stopped");
    shutdown_telemetry();
    result
}
