use std::collections::BTreeSet;

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
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    AppResult, Event, Rejection,
    connections::Relations,
    format,
    notifications::notify_or_log,
    privacy::{NotificationKind, Relationship},
    profiles::Profile,
    viewer::Viewer,
};

use super::{
    calendar::{EventView, visible},
    model::Seat,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn attend(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EventView>> {
    let mut event = visible(&db_pool, viewer, id).await?;
    let now = OffsetDateTime::now_utc();
    if event.has_ended(now) {
        return Err(Rejection::Conflict("event has ended").into());
    }
    match event.attend(&db_pool, viewer).await? {
        Seat::Full => return Err(Rejection::Conflict("event is full").into()),
        Seat::AlreadyAttending => {}
        Seat::Taken => info!(%id, attendees = event.attendees, "seat taken"),
    }
    Ok(Json(EventView::build(event, true, now)))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn leave(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut event = visible(&db_pool, viewer, id).await?;
    if !event.leave(&db_pool, viewer).await? {
        return Err(Rejection::NotFound("attendance").into());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(crate) struct Invite {
    invitees: Vec<Uuid>,
}

/// The organizer or an attendee invites others. Unknown, blocked and
/// self invitees are skipped; the count covers delivered notifications.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn invite(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Event>>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
    Json(Invite { invitees }): Json<Invite>,
) -> AppResult<Json<Value>> {
    let event = visible(&db_pool, viewer, id).await?;
    if event.organizer != viewer && !event.is_attending(&db_pool, viewer).await? {
        return Err(Rejection::Forbidden("only the organizer or attendees can invite").into());
    }
    if event.has_ended(OffsetDateTime::now_utc()) {
        return Err(Rejection::Conflict("event has ended").into());
    }

    let relations = Relations::load(&db_pool, viewer).await?;
    let title = format!("Invitation: {}", event.title);
    let body = format!("{} on {}", event.kind.label(), format::calendar_date(event.starts_at));
    let mut invited = 0u32;
    for invitee in invitees.into_iter().collect::<BTreeSet<_>>() {
        if matches!(relations.of(invitee), Relationship::Myself | Relationship::Blocked) {
            continue;
        }
        if Profile::load(&db_pool, invitee).await?.is_none() {
            debug!(%invitee, "invitee not found");
            continue;
        }
        if notify_or_log(&db_pool, &tx, invitee, NotificationKind::EventInvite, &title, &body).await {
            invited += 1;
        }
    }

    Ok(Json(json!({ "invited": invited })))
}
