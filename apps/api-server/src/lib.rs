//! # NexSocial API Server
//!
//! Actix-web application: configuration, shared state, HTTP handlers,
//! middleware, telemetry and the background job workers.

pub mod background;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod state;
pub mod telemetry;
