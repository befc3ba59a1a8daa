//! Connection and mentorship requests, blocks, and the relationship they add up to.

mod block;
pub mod model;
pub mod relation;
mod request;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::AppState;

pub use relation::{Relations, resolve};

pub fn requests_router() -> Router<AppState> {
    Router::new()
        .route("/", get(request::list_requests).post(request::new_request))
        .route("/{id}", delete(request::cancel))
        .route("/{id}/accept", post(request::accept))
        .route("/{id}/decline", post(request::decline))
}

pub fn blocks_router() -> Router<AppState> {
    Router::new().route("/{id}", post(block::block).delete(block::unblock))
}
