use std::{num::NonZeroU32, str::FromStr};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use time::OffsetDateTime;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT,
        location TEXT,
        current_job TEXT,
        company TEXT,
        skills TEXT NOT NULL DEFAULT '[]',
        major TEXT NOT NULL,
        graduation_year INTEGER NOT NULL,
        bio TEXT,
        avatar_url TEXT,
        social_links TEXT NOT NULL DEFAULT '{}',
        privacy TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL,
        last_active INTEGER
    )"#,
    r#"CREATE TABLE IF NOT EXISTS requests (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        requester TEXT NOT NULL REFERENCES profiles(id),
        target TEXT NOT NULL REFERENCES profiles(id),
        status TEXT NOT NULL,
        message TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL,
        CHECK (requester <> target)
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS requests_one_pending
        ON requests (kind, requester, target) WHERE status = 'pending'"#,
    r#"CREATE TABLE IF NOT EXISTS blocks (
        blocker TEXT NOT NULL REFERENCES profiles(id),
        blocked TEXT NOT NULL REFERENCES profiles(id),
        created_at INTEGER NOT NULL,
        PRIMARY KEY (blocker, blocked)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        created_by TEXT NOT NULL REFERENCES profiles(id),
        created_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS participants (
        conversation_id TEXT NOT NULL REFERENCES conversations(id),
        profile_id TEXT NOT NULL REFERENCES profiles(id),
        PRIMARY KEY (conversation_id, profile_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL REFERENCES conversations(id),
        sender TEXT NOT NULL REFERENCES profiles(id),
        kind TEXT NOT NULL,
        payload TEXT NOT NULL,
        sent_at INTEGER NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS messages_by_conversation
        ON messages (conversation_id, sent_at)"#,
    r#"CREATE TABLE IF NOT EXISTS receipts (
        message_id TEXT NOT NULL REFERENCES messages(id),
        profile_id TEXT NOT NULL REFERENCES profiles(id),
        delivered INTEGER NOT NULL DEFAULT 0,
        read INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (message_id, profile_id)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS receipts_by_profile
        ON receipts (profile_id, read)"#,
    r#"CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        recipient TEXT NOT NULL REFERENCES profiles(id),
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        read INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        posted_by TEXT NOT NULL REFERENCES profiles(id),
        title TEXT NOT NULL,
        company TEXT NOT NULL,
        description TEXT NOT NULL,
        requirements TEXT,
        location TEXT,
        salary TEXT,
        job_type TEXT NOT NULL,
        experience TEXT NOT NULL,
        remote INTEGER NOT NULL DEFAULT 0,
        application_url TEXT,
        contact_email TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        posted_at INTEGER NOT NULL,
        expires_at INTEGER NOT NULL,
        active INTEGER NOT NULL DEFAULT 1
    )"#,
    r#"CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        organizer TEXT NOT NULL REFERENCES profiles(id),
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        kind TEXT NOT NULL,
        venue TEXT,
        address TEXT,
        online_link TEXT,
        starts_at INTEGER NOT NULL,
        ends_at INTEGER NOT NULL,
        max_attendees INTEGER,
        created_at INTEGER NOT NULL,
        CHECK (ends_at >= starts_at)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS attendees (
        event_id TEXT NOT NULL REFERENCES events(id),
        profile_id TEXT NOT NULL REFERENCES profiles(id),
        joined_at INTEGER NOT NULL,
        PRIMARY KEY (event_id, profile_id)
    )"#,
];

pub async fn connect(url: &str, max_connections: NonZeroU32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(max_connections.get())
        .connect_with(options)
        .await
}

/// Single-connection in-memory database; the connection is never recycled,
/// so the data lives as long as the pool.
pub async fn memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(statements = SCHEMA.len(), "schema ready");
    Ok(())
}

/// True when a unique constraint refused the write, however deep the cause sits.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(sqlx::Error::as_database_error)
            .is_some_and(|db| db.is_unique_violation())
    })
}

/// `%needle%` for a LIKE with `ESCAPE '\'`; wildcards in the needle match literally.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn to_millis(at: OffsetDateTime) -> i64 {
    // whole milliseconds since the epoch fit i64 for any representable date
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_millis(millis: i64) -> anyhow::Result<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)?)
}

pub fn now_millis() -> i64 {
    to_millis(OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn millis_round_trip_keeps_precision() {
        let at = datetime!(2026-10-18 09:30:15.250 UTC);
        let millis = to_millis(at);
        assert_eq!(millis % 1000, 250);
        assert_eq!(from_millis(millis).unwrap(), at);
    }

    #[test]
    fn like_wildcards_are_literal() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = memory().await.unwrap();
        migrate(&pool).await.unwrap();
        let (tables,): (i64,) =
            sqlx::query_as("SELECT count(*) FROM sqlite_master WHERE type = 'table'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(tables, 11);
    }

    #[tokio::test]
    async fn unique_violations_are_recognised_through_context() {
        use anyhow::Context;

        let pool = memory().await.unwrap();
        let insert = "INSERT INTO profiles (id, full_name, email, major, graduation_year, created_at) \
                      VALUES (?1, 'Jane', 'jane@example.com', 'Law', 2020, 0)";
        sqlx::query(insert).bind("a").execute(&pool).await.unwrap();
        let err = sqlx::query(insert)
            .bind("b")
            .execute(&pool)
            .await
            .context("insert profile")
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&anyhow::anyhow!("unrelated")));
    }
}
