use axum::{Json, debug_handler, extract::State};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppResult, db, format, viewer::Viewer};

use super::model::{self, MessageKind};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InboxEntry {
    id: Uuid,
    participants: Vec<Uuid>,
    preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    when: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    badge: Option<String>,
    unread: u32,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn inbox(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
) -> AppResult<Json<Vec<InboxEntry>>> {
    let me = viewer.to_string();
    // (id, last kind, last payload, last sent_at, unread)
    let rows: Vec<(String, Option<String>, Option<String>, Option<i64>, i64)> = sqlx::query_as(
        "SELECT c.id, m.kind, m.payload, m.sent_at, \
             (SELECT count(*) FROM receipts r JOIN messages u ON u.id = r.message_id \
              WHERE u.conversation_id = c.id AND r.profile_id = ?1 AND r.read = 0) \
         FROM conversations c \
         JOIN participants p ON p.conversation_id = c.id AND p.profile_id = ?1 \
         LEFT JOIN messages m ON m.id = ( \
             SELECT id FROM messages WHERE conversation_id = c.id ORDER BY sent_at DESC, id DESC LIMIT 1) \
         ORDER BY coalesce(m.sent_at, c.created_at) DESC",
    )
    .bind(&me)
    .fetch_all(&db_pool)
    .await?;

    let now = OffsetDateTime::now_utc();
    let mut entries = Vec::with_capacity(rows.len());
    for (id, kind, payload, sent_at, unread) in rows {
        let id = Uuid::parse_str(&id)?;
        let kind = kind.map(|k| k.parse::<MessageKind>()).transpose()?;
        let last = kind.zip(payload.as_deref());
        let unread = u32::try_from(unread)?;
        entries.push(InboxEntry {
            id,
            participants: model::participants(&db_pool, id).await?,
            preview: model::preview(last),
            when: sent_at
                .map(|at| db::from_millis(at).map(|at| format::relative_time(at, now)))
                .transpose()?,
            badge: format::unread_badge(unread),
            unread,
        });
    }

    Ok(Json(entries))
}
