//! Direct and group conversations between alumni.

mod inbox;
pub mod model;
mod msg;
mod new;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use model::{MessageKind, MessageView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(inbox::inbox).post(new::new_conversation))
        .route("/{id}/messages", get(msg::list_messages).post(msg::post_message))
        .route("/{id}/read", post(msg::mark_read))
        .route("/{id}/ws", get(ws::conversation_ws))
}
