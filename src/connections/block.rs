use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{AppResult, Rejection, db, profiles::Profile, viewer::Viewer};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn block(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(target): Path<Uuid>,
) -> AppResult<StatusCode> {
    if target == viewer {
        return Err(Rejection::BadRequest("cannot block yourself".into()).into());
    }
    if Profile::load(&db_pool, target).await?.is_none() {
        return Err(Rejection::NotFound("profile").into());
    }

    let (me, them) = (viewer.to_string(), target.to_string());
    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT OR IGNORE INTO blocks (blocker,blocked,created_at) VALUES (?,?,?)")
        .bind(&me)
        .bind(&them)
        .bind(db::now_millis())
        .execute(&mut *tx)
        .await?;
    let dropped = sqlx::query(
        "DELETE FROM requests WHERE status='pending' \
         AND ((requester=?1 AND target=?2) OR (requester=?2 AND target=?1))",
    )
    .bind(&me)
    .bind(&them)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    info!(%target, dropped, "blocked");
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn unblock(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(target): Path<Uuid>,
) -> AppResult<StatusCode> {
    let removed = sqlx::query("DELETE FROM blocks WHERE blocker=? AND blocked=?")
        .bind(viewer.to_string())
        .bind(target.to_string())
        .execute(&db_pool)
        .await?
        .rows_affected();
    if removed == 0 {
        return Err(Rejection::NotFound("block").into());
    }
    info!(%target, "unblocked");
    Ok(StatusCode::NO_CONTENT)
}
