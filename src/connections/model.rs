use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Connection,
    Mentorship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

/// How the target answers a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Accept,
    Decline,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown request {0} `{1}`")]
pub struct UnknownValue(&'static str, String);

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Connection => "connection",
            RequestKind::Mentorship => "mentorship",
        }
    }
}

impl FromStr for RequestKind {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connection" => Ok(RequestKind::Connection),
            "mentorship" => Ok(RequestKind::Mentorship),
            other => Err(UnknownValue("kind", other.to_owned())),
        }
    }
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Declined => "declined",
        }
    }

    /// Next status after `action`, or `None` once the request is settled.
    pub fn apply(self, action: Action) -> Option<RequestStatus> {
        match (self, action) {
            (RequestStatus::Pending, Action::Accept) => Some(RequestStatus::Accepted),
            (RequestStatus::Pending, Action::Decline) => Some(RequestStatus::Declined),
            _ => None,
        }
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "declined" => Ok(RequestStatus::Declined),
            other => Err(UnknownValue("status", other.to_owned())),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: String,
    kind: String,
    requester: String,
    target: String,
    status: String,
    message: String,
    created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Uuid,
    pub kind: RequestKind,
    pub requester: Uuid,
    pub target: Uuid,
    pub status: RequestStatus,
    pub message: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<RequestRow> for Request {
    type Error = anyhow::Error;

    fn try_from(row: RequestRow) -> anyhow::Result<Request> {
        Ok(Request {
            id: Uuid::parse_str(&row.id)?,
            kind: row.kind.parse()?,
            requester: Uuid::parse_str(&row.requester)?,
            target: Uuid::parse_str(&row.target)?,
            status: row.status.parse()?,
            message: row.message,
            created_at: db::from_millis(row.created_at)?,
        })
    }
}

const COLUMNS: &str = "id,kind,requester,target,status,message,created_at";

impl Request {
    pub fn new(kind: RequestKind, requester: Uuid, target: Uuid, message: String) -> Request {
        Request {
            id: Uuid::now_v7(),
            kind,
            requester,
            target,
            status: RequestStatus::Pending,
            message,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub async fn load(db_pool: &SqlitePool, id: Uuid) -> anyhow::Result<Option<Request>> {
        let row: Option<RequestRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM requests WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(db_pool)
            .await?;
        row.map(Request::try_from).transpose()
    }

    /// Every request the profile sent or received, newest first.
    pub async fn involving(db_pool: &SqlitePool, profile: Uuid) -> anyhow::Result<Vec<Request>> {
        let rows: Vec<RequestRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM requests WHERE requester=?1 OR target=?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(profile.to_string())
        .fetch_all(db_pool)
        .await?;
        rows.into_iter().map(Request::try_from).collect()
    }

    pub async fn pending_exists(
        db_pool: &SqlitePool,
        kind: RequestKind,
        requester: Uuid,
        target: Uuid,
    ) -> anyhow::Result<bool> {
        Ok(sqlx::query("SELECT 1 FROM requests WHERE kind=? AND requester=? AND target=? AND status='pending'")
            .bind(kind.as_str())
            .bind(requester.to_string())
            .bind(target.to_string())
            .fetch_optional(db_pool)
            .await?
            .is_some())
    }

    pub async fn insert(&self, db_pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(&format!("INSERT INTO requests ({COLUMNS}) VALUES (?,?,?,?,?,?,?)"))
            .bind(self.id.to_string())
            .bind(self.kind.as_str())
            .bind(self.requester.to_string())
            .bind(self.target.to_string())
            .bind(self.status.as_str())
            .bind(&self.message)
            .bind(db::to_millis(self.created_at))
            .execute(db_pool)
            .await?;
        Ok(())
    }

    /// Moves a pending request on; `false` when it was already settled.
    pub async fn settle(&mut self, db_pool: &SqlitePool, action: Action) -> anyhow::Result<bool> {
        let Some(next) = self.status.apply(action) else {
            return Ok(false);
        };
        let changed = sqlx::query("UPDATE requests SET status=? WHERE id=? AND status='pending'")
            .bind(next.as_str())
            .bind(self.id.to_string())
            .execute(db_pool)
            .await?
            .rows_affected();
        if changed == 1 {
            self.status = next;
        }
        Ok(changed == 1)
    }

    /// Withdraws a request that is still pending; `false` once it was answered.
    pub async fn withdraw(&self, db_pool: &SqlitePool) -> anyhow::Result<bool> {
        let removed = sqlx::query("DELETE FROM requests WHERE id=? AND status='pending'")
            .bind(self.id.to_string())
            .execute(db_pool)
            .await?
            .rows_affected();
        Ok(removed == 1)
    }

    /// The other side of the request as seen from `profile`.
    pub fn counterpart(&self, profile: Uuid) -> Uuid {
        if self.requester == profile { self.target } else { self.requester }
    }
}
