//! Job board: postings shared by alumni, announced to their connections.

mod board;
pub mod model;
mod new;

use axum::{Router, routing::get};

use crate::AppState;

pub use board::JobView;
pub use model::{Experience, Job, JobType};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(board::list_jobs).post(new::new_job))
        .route("/{id}", get(board::job).delete(board::close_job))
}
