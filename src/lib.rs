pub mod config;
pub mod connections;
pub mod conversations;
pub mod db;
pub mod events;
pub mod fault;
pub mod format;
pub mod jobs;
pub mod notifications;
pub mod privacy;
pub mod profiles;
pub mod retry;
pub mod validate;
pub mod viewer;

use std::num::NonZeroUsize;

use axum::{
    Json, Router,
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    conversations::MessageView, fault::Category, notifications::NotificationView,
    validate::ValidationErrors,
};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tx: broadcast::Sender<Event>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, capacity: NonZeroUsize) -> AppState {
        AppState {
            db_pool,
            tx: broadcast::channel(capacity.get()).0,
        }
    }
}

/// Live update fanned out to websocket subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Message {
        conversation_id: Uuid,
        message: MessageView,
    },
    #[serde(rename_all = "camelCase")]
    Notification {
        recipient: Uuid,
        notification: NotificationView,
    },
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/p", profiles::router())
        .nest("/r", connections::requests_router())
        .nest("/b", connections::blocks_router())
        .nest("/c", conversations::router())
        .nest("/n", notifications::router())
        .nest("/j", jobs::router())
        .nest("/e", events::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Refusals a handler reports on purpose; anything else is an internal failure.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("missing or unknown caller identity")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl Rejection {
    fn status(&self) -> StatusCode {
        match self {
            Rejection::Unauthorized => StatusCode::UNAUTHORIZED,
            Rejection::NotFound(_) => StatusCode::NOT_FOUND,
            Rejection::Forbidden(_) => StatusCode::FORBIDDEN,
            Rejection::Conflict(_) => StatusCode::CONFLICT,
            Rejection::BadRequest(_) | Rejection::Invalid(_) => StatusCode::BAD_REQUEST,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(rejection) = self.0.downcast_ref::<Rejection>() {
            let body = match rejection {
                Rejection::Invalid(errors) => json!({ "error": "invalid input", "fields": errors }),
                other => json!({ "error": other.to_string() }),
            };
            return (rejection.status(), Json(body)).into_response();
        }

        let class = fault::classify_error(&self.0);
        fault::report(&class, "request", &format!("{:#}", self.0));
        let status = if class.retryable && class.category == Category::Network {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(json!({
                "error": class.user_message,
                "retryable": class.retryable,
                "feedback": class.feedback(),
                "logout": class.forces_logout(),
            })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
