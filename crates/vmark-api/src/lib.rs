//! Axum HTTP API server.
//!
//! This crate provides:
//! - The upload form and synchronous annotation runs
//! - Range-aware playback of annotated videos
//! - Rate limiting and security headers
//! - Prometheus metrics and health/readiness probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod sweeper;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
pub use sweeper::RetentionSweeper;
