use std::collections::BTreeMap;

use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{AppResult, Rejection, privacy::PrivacySettings, viewer::Viewer};

async fn store(
    db_pool: &SqlitePool,
    viewer: Uuid,
    id: Uuid,
    change: PrivacySettings,
    replace: bool,
) -> AppResult<BTreeMap<String, bool>> {
    if id != viewer {
        return Err(Rejection::Forbidden("only the owner can change privacy settings").into());
    }
    if let Some(key) = change.unknown_keys().next() {
        return Err(Rejection::BadRequest(format!("unknown setting `{key}`")).into());
    }

    // merged by the database in the same statement that writes it
    let statement = if replace {
        "UPDATE profiles SET privacy=?1 WHERE id=?2 RETURNING privacy"
    } else {
        "UPDATE profiles SET privacy=json_patch(privacy, ?1) WHERE id=?2 RETURNING privacy"
    };
    let stored: Option<(String,)> = sqlx::query_as(statement)
        .bind(serde_json::to_string(&change)?)
        .bind(id.to_string())
        .fetch_optional(db_pool)
        .await?;
    let Some((stored,)) = stored else {
        return Err(Rejection::NotFound("profile").into());
    };
    let settings: PrivacySettings = serde_json::from_str(&stored)?;
    info!(%id, replace, "privacy settings saved");

    Ok(settings.resolved())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn replace_privacy(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
    Json(settings): Json<PrivacySettings>,
) -> AppResult<Json<BTreeMap<String, bool>>> {
    Ok(Json(store(&db_pool, viewer, id, settings, true).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn merge_privacy(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
    Json(settings): Json<PrivacySettings>,
) -> AppResult<Json<BTreeMap<String, bool>>> {
    Ok(Json(store(&db_pool, viewer, id, settings, false).await?))
}
