use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db, format,
    privacy::{Preference, PrivacySettings},
};

/// Longest last-message preview in the inbox.
pub const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    Location,
    /// Written by the server only.
    System,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown message kind `{0}`")]
pub struct UnknownKind(String);

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::File => "file",
            MessageKind::Location => "location",
            MessageKind::System => "system",
        }
    }
}

impl FromStr for MessageKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "file" => Ok(MessageKind::File),
            "location" => Ok(MessageKind::Location),
            "system" => Ok(MessageKind::System),
            other => Err(UnknownKind(other.to_owned())),
        }
    }
}

/// Inbox line for the latest message of a conversation.
pub fn preview(last: Option<(MessageKind, &str)>) -> String {
    match last {
        None => "No messages yet".to_owned(),
        Some((MessageKind::Image, _)) => "\u{1f4f7} Photo".to_owned(),
        Some((MessageKind::File, _)) => "\u{1f4ce} File".to_owned(),
        Some((MessageKind::Location, _)) => "\u{1f4cd} Location".to_owned(),
        Some((_, text)) if text.is_empty() => "No messages yet".to_owned(),
        Some((_, text)) => format::truncate(text, PREVIEW_CHARS),
    }
}

/// A stored message with receipt flags from one participant's side: their
/// own receipt, or for their own messages the least advanced recipient's.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MessageRow {
    id: String,
    sender: String,
    kind: String,
    payload: String,
    sent_at: i64,
    delivered: i64,
    read: i64,
}

pub(crate) async fn messages_for(
    db_pool: &SqlitePool,
    conversation: Uuid,
    viewer: Uuid,
) -> anyhow::Result<Vec<MessageRow>> {
    Ok(sqlx::query_as(
        "SELECT m.id, m.sender, m.kind, m.payload, m.sent_at, \
             CASE WHEN m.sender = ?2 \
                 THEN (SELECT coalesce(min(r.delivered), 0) FROM receipts r WHERE r.message_id = m.id) \
                 ELSE (SELECT coalesce(max(r.delivered), 0) FROM receipts r \
                       WHERE r.message_id = m.id AND r.profile_id = ?2) \
             END AS delivered, \
             CASE WHEN m.sender = ?2 \
                 THEN (SELECT coalesce(min(r.read), 0) FROM receipts r WHERE r.message_id = m.id) \
                 ELSE (SELECT coalesce(max(r.read), 0) FROM receipts r \
                       WHERE r.message_id = m.id AND r.profile_id = ?2) \
             END AS read \
         FROM messages m WHERE m.conversation_id = ?1 ORDER BY m.sent_at, m.id",
    )
    .bind(conversation.to_string())
    .bind(viewer.to_string())
    .fetch_all(db_pool)
    .await?)
}

/// One chat message as a participant sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub sender: Uuid,
    pub kind: MessageKind,
    pub payload: String,
    /// Unix milliseconds.
    pub sent_at: i64,
    pub when: String,
    pub delivered: bool,
    /// Hidden from the sender while a recipient keeps read receipts off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

impl MessageView {
    pub(crate) fn from_row(
        row: MessageRow,
        viewer: Uuid,
        receipts: bool,
        now: OffsetDateTime,
    ) -> anyhow::Result<MessageView> {
        let sender = Uuid::parse_str(&row.sender)?;
        Ok(MessageView {
            id: Uuid::parse_str(&row.id)?,
            sender,
            kind: row.kind.parse()?,
            payload: row.payload,
            sent_at: row.sent_at,
            when: format::relative_time(db::from_millis(row.sent_at)?, now),
            delivered: row.delivered != 0,
            read: (sender != viewer || receipts).then_some(row.read != 0),
        })
    }
}

pub async fn participants(db_pool: &SqlitePool, conversation: Uuid) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT profile_id FROM participants WHERE conversation_id=? ORDER BY profile_id")
            .bind(conversation.to_string())
            .fetch_all(db_pool)
            .await?;
    rows.into_iter()
        .map(|(id,)| Ok(Uuid::parse_str(&id)?))
        .collect()
}

/// Whether `viewer`'s own messages may show read state: only when every other
/// participant allows read receipts.
pub async fn receipts_visible(db_pool: &SqlitePool, conversation: Uuid, viewer: Uuid) -> anyhow::Result<bool> {
    let others: Vec<(String,)> = sqlx::query_as(
        "SELECT p.privacy FROM participants c JOIN profiles p ON p.id = c.profile_id \
         WHERE c.conversation_id=? AND c.profile_id<>?",
    )
    .bind(conversation.to_string())
    .bind(viewer.to_string())
    .fetch_all(db_pool)
    .await?;
    for (privacy,) in others {
        let settings: PrivacySettings = serde_json::from_str(&privacy)?;
        if !settings.allows(Preference::AllowReadReceipts) {
            return Ok(false);
        }
    }
    Ok(true)
}
