use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{AppResult, Rejection, connections, privacy::Relationship, viewer::Viewer};

use super::{Profile, ProfileView};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn profile(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProfileView>> {
    let sorry = Rejection::NotFound("profile");

    let Some(owner) = Profile::load(&db_pool, id).await? else {
        return Err(sorry.into());
    };
    let relationship = connections::resolve(&db_pool, viewer, id).await?;
    if relationship == Relationship::Blocked {
        debug!(%viewer, owner = %id, "profile hidden by block");
        return Err(sorry.into());
    }

    Ok(Json(ProfileView::build(viewer, &owner, relationship, OffsetDateTime::now_utc())))
}
