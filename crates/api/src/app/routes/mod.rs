use axum::{
    Router,
    routing::{get, post},
};

pub mod events;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/", post(events::receive))
        .route("/health", get(system::health))
}
