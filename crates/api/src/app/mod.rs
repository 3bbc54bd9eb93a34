//! Receiver application wiring (Axum router + shared dispatcher).
//!
//! - `services.rs`: state shared by handlers (the dispatcher)
//! - `routes/`: HTTP routes + handlers
//! - `binding.rs`: HTTP request → envelope mapping (binary and structured mode)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, extract::DefaultBodyLimit};
use tower::ServiceBuilder;

pub mod binding;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Largest request body accepted (Pub/Sub caps messages at 10 MB).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the receiver router with the standard decoder registry.
pub fn build_app() -> Router {
    build_app_with(Arc::new(AppServices::default()))
}

/// Build the receiver router around the given services.
pub fn build_app_with(services: Arc<AppServices>) -> Router {
    routes::router().layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(Extension(services)),
    )
}
