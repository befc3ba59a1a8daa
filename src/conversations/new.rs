use std::collections::BTreeSet;

use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppResult, Rejection,
    connections::Relations,
    db,
    privacy::{Preference, Relationship},
    profiles::Profile,
    viewer::Viewer,
};

#[derive(Debug, Deserialize)]
pub(crate) struct NewConversation {
    participants: Vec<Uuid>,
}

/// An existing two-person conversation between exactly `a` and `b`.
async fn find_direct(db_pool: &SqlitePool, a: Uuid, b: Uuid) -> anyhow::Result<Option<Uuid>> {
    let found: Option<(String,)> = sqlx::query_as(
        "SELECT conversation_id FROM participants GROUP BY conversation_id \
         HAVING count(*) = 2 AND sum(profile_id IN (?1, ?2)) = 2 LIMIT 1",
    )
    .bind(a.to_string())
    .bind(b.to_string())
    .fetch_optional(db_pool)
    .await?;
    found.map(|(id,)| Ok(Uuid::parse_str(&id)?)).transpose()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_conversation(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Json(NewConversation { participants }): Json<NewConversation>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let others: BTreeSet<Uuid> = participants.into_iter().filter(|p| *p != viewer).collect();
    if others.is_empty() {
        return Err(Rejection::BadRequest("a conversation needs another participant".into()).into());
    }

    let relations = Relations::load(&db_pool, viewer).await?;
    for &other in &others {
        let Some(profile) = Profile::load(&db_pool, other).await? else {
            return Err(Rejection::NotFound("profile").into());
        };
        match relations.of(other) {
            Relationship::Blocked => return Err(Rejection::NotFound("profile").into()),
            Relationship::Connection => {}
            _ if !profile.privacy.allows(Preference::AllowDirectMessages) => {
                return Err(Rejection::Forbidden("not accepting direct messages").into());
            }
            _ => {}
        }
    }

    if let [other] = others.iter().copied().collect::<Vec<_>>()[..] {
        if let Some(id) = find_direct(&db_pool, viewer, other).await? {
            return Ok((StatusCode::OK, Json(json!({ "id": id }))));
        }
    }

    let id = Uuid::now_v7();
    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO conversations (id,created_by,created_at) VALUES (?,?,?)")
        .bind(id.to_string())
        .bind(viewer.to_string())
        .bind(db::now_millis())
        .execute(&mut *tx)
        .await?;
    for member in others.iter().chain([&viewer]) {
        sqlx::query("INSERT INTO participants (conversation_id,profile_id) VALUES (?,?)")
            .bind(id.to_string())
            .bind(member.to_string())
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    info!(%id, participants = others.len() + 1, "conversation started");

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}
