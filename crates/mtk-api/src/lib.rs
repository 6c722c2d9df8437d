//! Axum HTTP API server.
//!
//! This crate provides:
//! - The media and speech operations as units of work for the dispatcher
//! - API-key protected `/v1` routes, job status and artifact download
//! - The delegated-execution entry for remote job runs
//! - Prometheus metrics and security headers

pub mod config;
pub mod delegated;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod operations;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, JobError};
pub use logging::JobLogger;
pub use operations::{Operation, OperationRegistry, Toolkit};
pub use routes::create_router;
pub use state::AppState;
