use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{AppResult, Rejection, db, profiles::non_blank, viewer::Viewer};

use super::model::{AlumniEvent, EventKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewEvent {
    title: String,
    description: String,
    kind: EventKind,
    venue: Option<String>,
    address: Option<String>,
    online_link: Option<String>,
    /// Unix milliseconds.
    starts_at: i64,
    /// Unix milliseconds.
    ends_at: i64,
    max_attendees: Option<u32>,
}

impl NewEvent {
    fn into_event(self, organizer: Uuid, now: OffsetDateTime) -> AppResult<AlumniEvent> {
        let event = AlumniEvent {
            id: Uuid::now_v7(),
            organizer,
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            kind: self.kind,
            venue: non_blank(self.venue),
            address: non_blank(self.address),
            online_link: non_blank(self.online_link),
            starts_at: db::from_millis(self.starts_at)
                .map_err(|_| Rejection::BadRequest("startsAt is out of range".into()))?,
            ends_at: db::from_millis(self.ends_at)
                .map_err(|_| Rejection::BadRequest("endsAt is out of range".into()))?,
            max_attendees: self.max_attendees,
            created_at: now,
            attendees: 0,
        };
        event.validate(now).map_err(Rejection::from)?;
        Ok(event)
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_event(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Json(form): Json<NewEvent>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let event = form.into_event(viewer, OffsetDateTime::now_utc())?;
    event.insert(&db_pool).await?;
    info!(id = %event.id, kind = event.kind.as_str(), "event created");
    Ok((StatusCode::CREATED, Json(json!({ "id": event.id }))))
}
