use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db,
    validate::{self, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS, ValidationErrors},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Reunion,
    Networking,
    Workshop,
    Seminar,
    Social,
    Career,
    Fundraising,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown event kind `{0}`")]
pub struct UnknownKind(String);

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Reunion,
        EventKind::Networking,
        EventKind::Workshop,
        EventKind::Seminar,
        EventKind::Social,
        EventKind::Career,
        EventKind::Fundraising,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Reunion => "reunion",
            EventKind::Networking => "networking",
            EventKind::Workshop => "workshop",
            EventKind::Seminar => "seminar",
            EventKind::Social => "social",
            EventKind::Career => "career",
            EventKind::Fundraising => "fundraising",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventKind::Reunion => "Alumni Reunion",
            EventKind::Networking => "Networking Event",
            EventKind::Workshop => "Workshop",
            EventKind::Seminar => "Seminar",
            EventKind::Social => "Social Event",
            EventKind::Career => "Career Event",
            EventKind::Fundraising => "Fundraising",
        }
    }
}

impl FromStr for EventKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_owned()))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct EventRow {
    id: String,
    organizer: String,
    title: String,
    description: String,
    kind: String,
    venue: Option<String>,
    address: Option<String>,
    online_link: Option<String>,
    starts_at: i64,
    ends_at: i64,
    max_attendees: Option<i64>,
    created_at: i64,
    attendees: i64,
}

/// Event columns plus the live attendee count.
pub(super) const SELECT: &str = "SELECT id,organizer,title,description,kind,venue,address,online_link,\
    starts_at,ends_at,max_attendees,created_at,\
    (SELECT count(*) FROM attendees a WHERE a.event_id = events.id) AS attendees FROM events";

/// A gathering organised by one alumnus. Online when it has a link.
#[derive(Debug, Clone, PartialEq)]
pub struct AlumniEvent {
    pub id: Uuid,
    pub organizer: Uuid,
    pub title: String,
    pub description: String,
    pub kind: EventKind,
    pub venue: Option<String>,
    pub address: Option<String>,
    pub online_link: Option<String>,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
    pub max_attendees: Option<u32>,
    pub created_at: OffsetDateTime,
    pub attendees: u32,
}

impl TryFrom<EventRow> for AlumniEvent {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> anyhow::Result<AlumniEvent> {
        Ok(AlumniEvent {
            id: Uuid::parse_str(&row.id)?,
            organizer: Uuid::parse_str(&row.organizer)?,
            title: row.title,
            description: row.description,
            kind: row.kind.parse()?,
            venue: row.venue,
            address: row.address,
            online_link: row.online_link,
            starts_at: db::from_millis(row.starts_at)?,
            ends_at: db::from_millis(row.ends_at)?,
            max_attendees: row.max_attendees.map(u32::try_from).transpose()?,
            created_at: db::from_millis(row.created_at)?,
            attendees: u32::try_from(row.attendees)?,
        })
    }
}

/// Outcome of asking for a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Taken,
    AlreadyAttending,
    Full,
}

impl AlumniEvent {
    pub async fn load(db_pool: &SqlitePool, id: Uuid) -> anyhow::Result<Option<AlumniEvent>> {
        let row: Option<EventRow> = sqlx::query_as(&format!("{SELECT} WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(db_pool)
            .await?;
        row.map(AlumniEvent::try_from).transpose()
    }

    pub async fn insert(&self, db_pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO events (id,organizer,title,description,kind,venue,address,online_link,\
             starts_at,ends_at,max_attendees,created_at) VALUES (?,?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(self.id.to_string())
        .bind(self.organizer.to_string())
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.kind.as_str())
        .bind(&self.venue)
        .bind(&self.address)
        .bind(&self.online_link)
        .bind(db::to_millis(self.starts_at))
        .bind(db::to_millis(self.ends_at))
        .bind(self.max_attendees)
        .bind(db::to_millis(self.created_at))
        .execute(db_pool)
        .await?;
        Ok(())
    }

    pub async fn is_attending(&self, db_pool: &SqlitePool, profile: Uuid) -> anyhow::Result<bool> {
        Ok(sqlx::query("SELECT 1 FROM attendees WHERE event_id=? AND profile_id=?")
            .bind(self.id.to_string())
            .bind(profile.to_string())
            .fetch_optional(db_pool)
            .await?
            .is_some())
    }

    /// Claims a seat for `profile`; the capacity check and the insert are one statement.
    pub async fn attend(&mut self, db_pool: &SqlitePool, profile: Uuid) -> anyhow::Result<Seat> {
        if self.is_attending(db_pool, profile).await? {
            return Ok(Seat::AlreadyAttending);
        }
        let taken = sqlx::query(
            "INSERT OR IGNORE INTO attendees (event_id,profile_id,joined_at) \
             SELECT e.id, ?2, ?3 FROM events e WHERE e.id = ?1 AND (e.max_attendees IS NULL \
                 OR (SELECT count(*) FROM attendees a WHERE a.event_id = e.id) < e.max_attendees)",
        )
        .bind(self.id.to_string())
        .bind(profile.to_string())
        .bind(db::now_millis())
        .execute(db_pool)
        .await?
        .rows_affected();
        if taken == 0 {
            return Ok(Seat::Full);
        }
        self.attendees += 1;
        Ok(Seat::Taken)
    }

    /// Gives up a seat; `false` when `profile` was not attending.
    pub async fn leave(&mut self, db_pool: &SqlitePool, profile: Uuid) -> anyhow::Result<bool> {
        let removed = sqlx::query("DELETE FROM attendees WHERE event_id=? AND profile_id=?")
            .bind(self.id.to_string())
            .bind(profile.to_string())
            .execute(db_pool)
            .await?
            .rows_affected();
        if removed == 1 {
            self.attendees = self.attendees.saturating_sub(1);
        }
        Ok(removed == 1)
    }

    pub fn is_online(&self) -> bool {
        self.online_link.is_some()
    }

    pub fn has_ended(&self, now: OffsetDateTime) -> bool {
        self.ends_at < now
    }

    pub fn has_space(&self) -> bool {
        self.max_attendees.is_none_or(|max| self.attendees < max)
    }

    pub fn validate(&self, now: OffsetDateTime) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        validate::required_text(&mut errors, "title", "Event title", &self.title, MAX_TITLE_CHARS);
        validate::required_text(
            &mut errors,
            "description",
            "Description",
            &self.description,
            MAX_DESCRIPTION_CHARS,
        );
        validate::short_text(&mut errors, "venue", "Venue", self.venue.as_deref().unwrap_or_default());
        validate::short_text(&mut errors, "address", "Address", self.address.as_deref().unwrap_or_default());
        validate::url(&mut errors, "onlineLink", self.online_link.as_deref().unwrap_or_default());
        if self.starts_at <= now {
            errors.push("startsAt", "Event must start in the future");
        }
        if self.ends_at < self.starts_at {
            errors.push("endsAt", "Event cannot end before it starts");
        }
        if self.max_attendees == Some(0) {
            errors.push("maxAttendees", "Capacity must be at least 1");
        }
        errors.into_result()
    }
}
