use axum::{
    Json, debug_handler,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    AppResult, Rejection, connections, db, format,
    privacy::Relationship,
    viewer::Viewer,
};

use super::model::{AlumniEvent, EventKind, EventRow, SELECT};

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;

/// An event as one viewer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: Uuid,
    pub organizer: Uuid,
    pub title: String,
    pub description: String,
    pub kind: EventKind,
    pub kind_label: &'static str,
    pub venue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_link: Option<String>,
    /// Unix milliseconds.
    pub starts_at: i64,
    /// Unix milliseconds.
    pub ends_at: i64,
    pub date: String,
    pub time: String,
    pub until: String,
    pub attendance: String,
    pub space_left: bool,
    pub attending: bool,
}

fn venue_line(event: &AlumniEvent) -> String {
    if event.is_online() {
        return "Online Event".to_owned();
    }
    match (event.venue.as_deref(), event.address.as_deref()) {
        (Some(venue), Some(address)) => format!("{venue}, {address}"),
        (Some(one), None) | (None, Some(one)) => one.to_owned(),
        (None, None) => "Venue TBD".to_owned(),
    }
}

fn attendance_line(event: &AlumniEvent) -> String {
    match event.max_attendees {
        Some(max) => format!("{}/{max} attending", event.attendees),
        None => format!("{} attending", event.attendees),
    }
}

impl EventView {
    pub fn build(event: AlumniEvent, attending: bool, now: OffsetDateTime) -> EventView {
        EventView {
            kind_label: event.kind.label(),
            venue: venue_line(&event),
            starts_at: db::to_millis(event.starts_at),
            ends_at: db::to_millis(event.ends_at),
            date: format::calendar_date(event.starts_at),
            time: format::time_range(event.starts_at, event.ends_at),
            until: format::until(event.starts_at, event.ends_at, now),
            attendance: attendance_line(&event),
            space_left: event.has_space(),
            attending,
            id: event.id,
            organizer: event.organizer,
            title: event.title,
            description: event.description,
            kind: event.kind,
            online_link: event.online_link,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventQuery {
    kind: Option<EventKind>,
    location: Option<String>,
    online: Option<bool>,
    limit: Option<u32>,
    #[serde(default)]
    offset: u32,
}

/// Events that have not ended, soonest first, never organised from across a block.
pub(crate) async fn upcoming(
    db_pool: &SqlitePool,
    viewer: Uuid,
    query: &EventQuery,
    now: OffsetDateTime,
) -> anyhow::Result<Vec<AlumniEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let location = query
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(db::like_pattern);
    let rows: Vec<EventRow> = sqlx::query_as(&format!(
        r"{SELECT}
        WHERE ends_at >= ?2
          AND organizer NOT IN (SELECT blocked FROM blocks WHERE blocker = ?1
                                UNION SELECT blocker FROM blocks WHERE blocked = ?1)
          AND (?3 IS NULL OR kind = ?3)
          AND (?4 IS NULL OR venue LIKE ?4 ESCAPE '\' OR address LIKE ?4 ESCAPE '\')
          AND (?5 IS NULL OR (online_link IS NOT NULL) = ?5)
        ORDER BY starts_at, id
        LIMIT ?6 OFFSET ?7"
    ))
    .bind(viewer.to_string())
    .bind(db::to_millis(now))
    .bind(query.kind.map(EventKind::as_str))
    .bind(location)
    .bind(query.online)
    .bind(limit)
    .bind(query.offset)
    .fetch_all(db_pool)
    .await?;
    rows.into_iter().map(AlumniEvent::try_from).collect()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_events(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<Vec<EventView>>> {
    let now = OffsetDateTime::now_utc();
    let mut views = Vec::new();
    for event in upcoming(&db_pool, viewer, &query, now).await? {
        let attending = event.is_attending(&db_pool, viewer).await?;
        views.push(EventView::build(event, attending, now));
    }
    Ok(Json(views))
}

/// The event, unless it is missing or a block separates viewer and organizer.
pub(crate) async fn visible(db_pool: &SqlitePool, viewer: Uuid, id: Uuid) -> AppResult<AlumniEvent> {
    let Some(event) = AlumniEvent::load(db_pool, id).await? else {
        return Err(Rejection::NotFound("event").into());
    };
    if connections::resolve(db_pool, viewer, event.organizer).await? == Relationship::Blocked {
        return Err(Rejection::NotFound("event").into());
    }
    Ok(event)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn event(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EventView>> {
    let event = visible(&db_pool, viewer, id).await?;
    let attending = event.is_attending(&db_pool, viewer).await?;
    Ok(Json(EventView::build(event, attending, OffsetDateTime::now_utc())))
}
