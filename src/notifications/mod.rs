//! In-app notifications, filtered by the recipient's preferences.

use axum::{
    Json, Router, debug_handler,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::{
    AppResult, AppState, Event, db, fault, format,
    privacy::{NotificationKind, should_notify},
    profiles::Profile,
    viewer::Viewer,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/read", post(mark_read))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub when: String,
    pub read: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Inbox {
    #[serde(skip_serializing_if = "Option::is_none")]
    badge: Option<String>,
    notifications: Vec<NotificationView>,
}

/// Stores and broadcasts a notification unless the recipient opted out of
/// `kind`. Returns whether it was delivered.
pub async fn notify(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<Event>,
    recipient: Uuid,
    kind: NotificationKind,
    title: &str,
    body: &str,
) -> anyhow::Result<bool> {
    let settings = Profile::privacy_of(db_pool, recipient).await?;
    if !should_notify(kind, &settings) {
        debug!(%recipient, kind = kind.as_str(), "notification suppressed");
        return Ok(false);
    }

    let id = Uuid::now_v7();
    let created_at = OffsetDateTime::now_utc();
    sqlx::query("INSERT INTO notifications (id,recipient,kind,title,body,created_at) VALUES (?,?,?,?,?,?)")
        .bind(id.to_string())
        .bind(recipient.to_string())
        .bind(kind.as_str())
        .bind(title)
        .bind(body)
        .bind(db::to_millis(created_at))
        .execute(db_pool)
        .await?;

    // nobody listening is fine
    let _ = tx.send(Event::Notification {
        recipient,
        notification: NotificationView {
            id,
            kind: kind.as_str().to_owned(),
            title: title.to_owned(),
            body: body.to_owned(),
            when: format::relative_time(created_at, created_at),
            read: false,
        },
    });
    Ok(true)
}

/// [`notify`] for callers whose own write already succeeded: a failure is
/// classified and logged instead of failing the caller.
pub async fn notify_or_log(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<Event>,
    recipient: Uuid,
    kind: NotificationKind,
    title: &str,
    body: &str,
) -> bool {
    match notify(db_pool, tx, recipient, kind, title, body).await {
        Ok(delivered) => delivered,
        Err(err) => {
            let class = fault::classify_error(&err);
            fault::report(&class, "notify", &format!("{recipient}: {err:#}"));
            false
        }
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
) -> AppResult<Json<Inbox>> {
    let rows: Vec<(String, String, String, String, i64, bool)> = sqlx::query_as(
        "SELECT id,kind,title,body,created_at,read FROM notifications \
         WHERE recipient=? ORDER BY created_at DESC, id DESC",
    )
    .bind(viewer.to_string())
    .fetch_all(&db_pool)
    .await?;

    let now = OffsetDateTime::now_utc();
    let mut unread = 0u32;
    let mut notifications = Vec::with_capacity(rows.len());
    for (id, kind, title, body, created_at, read) in rows {
        if !read {
            unread += 1;
        }
        notifications.push(NotificationView {
            id: Uuid::parse_str(&id)?,
            kind,
            title,
            body,
            when: format::relative_time(db::from_millis(created_at)?, now),
            read,
        });
    }

    Ok(Json(Inbox {
        badge: format::unread_badge(unread),
        notifications,
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn mark_read(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
) -> AppResult<Json<serde_json::Value>> {
    let marked = sqlx::query("UPDATE notifications SET read=1 WHERE recipient=? AND read=0")
        .bind(viewer.to_string())
        .execute(&db_pool)
        .await?
        .rows_affected();
    Ok(Json(serde_json::json!({ "marked": marked })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::model::tests::sample;

    #[tokio::test]
    async fn respects_preferences() {
        let pool = db::memory().await.unwrap();
        let (tx, mut rx) = broadcast::channel(8);
        let mut jane = sample("Jane Doe", "jane@example.com");
        jane.privacy.set("allow_direct_messages", false);
        jane.insert(&pool).await.unwrap();

        assert!(!notify(&pool, &tx, jane.id, NotificationKind::Message, "New message", "hi").await.unwrap());
        assert!(
            notify(&pool, &tx, jane.id, NotificationKind::ConnectionRequest, "New connection request", "")
                .await
                .unwrap()
        );

        let (stored,): (i64,) = sqlx::query_as("SELECT count(*) FROM notifications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 1);
        match rx.try_recv().unwrap() {
            Event::Notification { recipient, notification } => {
                assert_eq!(recipient, jane.id);
                assert_eq!(notification.kind, "connectionRequest");
                assert_eq!(notification.when, "Just now");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn failures_are_logged_not_raised() {
        let pool = db::memory().await.unwrap();
        let (tx, _rx) = broadcast::channel(8);
        let missing = Uuid::now_v7();
        assert!(notify(&pool, &tx, missing, NotificationKind::Message, "New message", "hi").await.is_err());
        assert!(!notify_or_log(&pool, &tx, missing, NotificationKind::Message, "New message", "hi").await);
    }
}
