use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::{AppError, Rejection, db};

/// Header set by the upstream identity provider once the caller signed in.
pub const USER_ID: &str = "x-user-id";

/// The signed-in alumnus making the request.
///
/// Extraction also records the caller as active, which feeds the presence
/// line others may see on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub Uuid);

impl<S> FromRequestParts<S> for Viewer
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID).and_then(|v| v.to_str().ok()) else {
            return Err(Rejection::Unauthorized.into());
        };
        let Ok(id) = Uuid::parse_str(raw.trim()) else {
            debug!(raw, "malformed caller id");
            return Err(Rejection::Unauthorized.into());
        };

        let db_pool = SqlitePool::from_ref(state);
        let touched = sqlx::query("UPDATE profiles SET last_active=? WHERE id=?")
            .bind(db::now_millis())
            .bind(id.to_string())
            .execute(&db_pool)
            .await?
            .rows_affected();
        if touched == 0 {
            return Err(Rejection::Unauthorized.into());
        }

        Ok(Viewer(id))
    }
}
