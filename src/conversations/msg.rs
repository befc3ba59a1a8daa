use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::{
    AppResult, Event, Rejection,
    connections::Relations,
    db, format,
    notifications::notify_or_log,
    privacy::{NotificationKind, Relationship},
    validate::{self, ValidationErrors},
    viewer::Viewer,
};

use super::model::{self, MessageKind, MessageView};

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessage {
    #[serde(default)]
    kind: MessageKind,
    payload: String,
}

/// Fails unless `viewer` takes part in `conversation`.
pub(crate) async fn require_participant(
    db_pool: &SqlitePool,
    conversation: Uuid,
    viewer: Uuid,
) -> AppResult<Vec<Uuid>> {
    let participants = model::participants(db_pool, conversation).await?;
    if participants.is_empty() {
        return Err(Rejection::NotFound("conversation").into());
    }
    if !participants.contains(&viewer) {
        return Err(Rejection::Forbidden("not a participant").into());
    }
    Ok(participants)
}

/// Stores a message with a receipt per recipient, fans it out to live
/// subscribers and notifies the other participants.
pub(crate) async fn send_msg(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<Event>,

    sender: Uuid,
    conversation_id: Uuid,

    SendMessage { kind, payload }: SendMessage,
) -> AppResult<MessageView> {
    let participants = require_participant(db_pool, conversation_id, sender).await?;
    // a block added after the conversation started closes it for both sides
    let relations = Relations::load(db_pool, sender).await?;
    if participants.iter().any(|p| relations.of(*p) == Relationship::Blocked) {
        return Err(Rejection::NotFound("conversation").into());
    }
    let recipients: Vec<Uuid> = participants.into_iter().filter(|p| *p != sender).collect();

    let payload = match kind {
        MessageKind::System => {
            return Err(Rejection::BadRequest("system messages cannot be sent".into()).into());
        }
        MessageKind::Text => {
            let mut errors = ValidationErrors::default();
            validate::message_text(&mut errors, &payload);
            errors.into_result().map_err(Rejection::from)?;
            payload.trim().to_owned()
        }
        _ if payload.trim().is_empty() => {
            return Err(Rejection::BadRequest("attachment payload is empty".into()).into());
        }
        _ => payload,
    };

    let id = Uuid::now_v7();
    let sent_at = OffsetDateTime::now_utc();
    let mut db_tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO messages (id,conversation_id,sender,kind,payload,sent_at) VALUES (?,?,?,?,?,?)")
        .bind(id.to_string())
        .bind(conversation_id.to_string())
        .bind(sender.to_string())
        .bind(kind.as_str())
        .bind(&payload)
        .bind(db::to_millis(sent_at))
        .execute(&mut *db_tx)
        .await?;
    for recipient in &recipients {
        sqlx::query("INSERT INTO receipts (message_id,profile_id) VALUES (?,?)")
            .bind(id.to_string())
            .bind(recipient.to_string())
            .execute(&mut *db_tx)
            .await?;
    }
    db_tx.commit().await?;

    let message = MessageView {
        id,
        sender,
        kind,
        payload,
        sent_at: db::to_millis(sent_at),
        when: format::relative_time(sent_at, sent_at),
        delivered: false,
        read: Some(false),
    };
    let _ = tx.send(Event::Message {
        conversation_id,
        message: message.clone(),
    });

    let (name,): (String,) = sqlx::query_as("SELECT full_name FROM profiles WHERE id=?")
        .bind(sender.to_string())
        .fetch_one(db_pool)
        .await?;
    let title = format!("New message from {name}");
    let body = model::preview(Some((kind, &message.payload)));
    for recipient in recipients {
        notify_or_log(db_pool, tx, recipient, NotificationKind::Message, &title, &body).await;
    }

    Ok(message)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Event>>,
    Viewer(viewer): Viewer,
    Path(conversation_id): Path<Uuid>,
    Json(msg): Json<SendMessage>,
) -> AppResult<(StatusCode, Json<MessageView>)> {
    let message = send_msg(&db_pool, &tx, viewer, conversation_id, msg).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_messages(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<Vec<MessageView>>> {
    require_participant(&db_pool, conversation_id, viewer).await?;

    let delivered = sqlx::query(
        "UPDATE receipts SET delivered=1 WHERE profile_id=?2 AND delivered=0 \
         AND message_id IN (SELECT id FROM messages WHERE conversation_id=?1)",
    )
    .bind(conversation_id.to_string())
    .bind(viewer.to_string())
    .execute(&db_pool)
    .await?
    .rows_affected();
    debug!(%conversation_id, delivered, "messages delivered");

    let rows = model::messages_for(&db_pool, conversation_id, viewer).await?;

    let receipts = model::receipts_visible(&db_pool, conversation_id, viewer).await?;
    let now = OffsetDateTime::now_utc();
    let messages = rows
        .into_iter()
        .map(|row| MessageView::from_row(row, viewer, receipts, now))
        .collect::<anyhow::Result<_>>()?;

    Ok(Json(messages))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mark_read(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    require_participant(&db_pool, conversation_id, viewer).await?;

    let marked = sqlx::query(
        "UPDATE receipts SET read=1, delivered=1 WHERE profile_id=?2 AND read=0 \
         AND message_id IN (SELECT id FROM messages WHERE conversation_id=?1)",
    )
    .bind(conversation_id.to_string())
    .bind(viewer.to_string())
    .execute(&db_pool)
    .await?
    .rows_affected();

    Ok(Json(json!({ "marked": marked })))
}
