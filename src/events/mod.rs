//! Alumni events: reunions, workshops and the like, with seats and invitations.

mod attend;
mod calendar;
pub mod model;
mod new;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use calendar::EventView;
pub use model::{AlumniEvent, EventKind};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(calendar::list_events).post(new::new_event))
        .route("/{id}", get(calendar::event))
        .route("/{id}/attend", post(attend::attend).delete(attend::leave))
        .route("/{id}/invite", post(attend::invite))
}
