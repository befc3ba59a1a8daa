use std::collections::HashSet;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::privacy::Relationship;

/// Everything the viewer's relationships depend on, loaded once.
///
/// Directory listings and conversation checks touch many owners; this keeps
/// them at two queries regardless of how many profiles are rendered.
#[derive(Debug, Clone, Default)]
pub struct Relations {
    viewer: Uuid,
    blocked: HashSet<Uuid>,
    connected: HashSet<Uuid>,
}

impl Relations {
    pub async fn load(db_pool: &SqlitePool, viewer: Uuid) -> anyhow::Result<Relations> {
        let me = viewer.to_string();

        let blocks: Vec<(String, String)> =
            sqlx::query_as("SELECT blocker,blocked FROM blocks WHERE blocker=?1 OR blocked=?1")
                .bind(&me)
                .fetch_all(db_pool)
                .await?;
        let accepted: Vec<(String, String)> = sqlx::query_as(
            "SELECT requester,target FROM requests WHERE status='accepted' AND (requester=?1 OR target=?1)",
        )
        .bind(&me)
        .fetch_all(db_pool)
        .await?;

        let other = |(a, b): (String, String)| -> anyhow::Result<Uuid> {
            let other = if a == me { b } else { a };
            Ok(Uuid::parse_str(&other)?)
        };

        Ok(Relations {
            viewer,
            blocked: blocks.into_iter().map(other).collect::<anyhow::Result<_>>()?,
            connected: accepted.into_iter().map(other).collect::<anyhow::Result<_>>()?,
        })
    }

    /// Accepted connections, minus anyone on either side of a block.
    pub fn connections(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.connected.iter().copied().filter(|id| !self.blocked.contains(id))
    }

    pub fn of(&self, owner: Uuid) -> Relationship {
        if owner == self.viewer {
            Relationship::Myself
        } else if self.blocked.contains(&owner) {
            Relationship::Blocked
        } else if self.connected.contains(&owner) {
            Relationship::Connection
        } else {
            Relationship::Public
        }
    }
}

/// How `owner` relates to `viewer`.
pub async fn resolve(db_pool: &SqlitePool, viewer: Uuid, owner: Uuid) -> anyhow::Result<Relationship> {
    if viewer == owner {
        return Ok(Relationship::Myself);
    }
    let (me, them) = (viewer.to_string(), owner.to_string());

    let blocked = sqlx::query(
        "SELECT 1 FROM blocks WHERE (blocker=?1 AND blocked=?2) OR (blocker=?2 AND blocked=?1)",
    )
    .bind(&me)
    .bind(&them)
    .fetch_optional(db_pool)
    .await?;
    if blocked.is_some() {
        return Ok(Relationship::Blocked);
    }

    let connected = sqlx::query(
        "SELECT 1 FROM requests WHERE status='accepted' \
         AND ((requester=?1 AND target=?2) OR (requester=?2 AND target=?1))",
    )
    .bind(&me)
    .bind(&them)
    .fetch_optional(db_pool)
    .await?;

    Ok(if connected.is_some() {
        Relationship::Connection
    } else {
        Relationship::Public
    })
}
