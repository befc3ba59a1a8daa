use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppResult, Event, Rejection, format,
    db,
    notifications::notify_or_log,
    privacy::{NotificationKind, Preference, Relationship},
    profiles::Profile,
    validate::{MAX_BIO_CHARS, ValidationErrors},
    viewer::Viewer,
};

use super::{
    model::{Action, Request, RequestKind, RequestStatus},
    relation,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewRequest {
    target: Uuid,
    kind: RequestKind,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestView {
    id: Uuid,
    kind: RequestKind,
    status: RequestStatus,
    incoming: bool,
    counterpart: Uuid,
    message: String,
    sent: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_request(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Event>>,
    Viewer(viewer): Viewer,
    Json(NewRequest { target, kind, message }): Json<NewRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    if target == viewer {
        return Err(Rejection::BadRequest("cannot send a request to yourself".into()).into());
    }
    if message.chars().count() > MAX_BIO_CHARS {
        let mut errors = ValidationErrors::default();
        errors.push("message", format!("Message must be less than {MAX_BIO_CHARS} characters"));
        return Err(Rejection::from(errors).into());
    }

    let Some(owner) = Profile::load(&db_pool, target).await? else {
        return Err(Rejection::NotFound("profile").into());
    };
    match relation::resolve(&db_pool, viewer, target).await? {
        Relationship::Blocked => return Err(Rejection::NotFound("profile").into()),
        Relationship::Connection if kind == RequestKind::Connection => {
            return Err(Rejection::Conflict("already connected").into());
        }
        _ => {}
    }
    if kind == RequestKind::Mentorship && !owner.privacy.allows(Preference::AllowMentorRequests) {
        return Err(Rejection::Forbidden("not accepting mentorship requests").into());
    }
    if Request::pending_exists(&db_pool, kind, viewer, target).await? {
        return Err(Rejection::Conflict("request already pending").into());
    }

    let request = Request::new(kind, viewer, target, message);
    // the check above can race a concurrent send; the unique index settles it
    if let Err(err) = request.insert(&db_pool).await {
        if db::is_unique_violation(&err) {
            return Err(Rejection::Conflict("request already pending").into());
        }
        return Err(err.into());
    }
    info!(id = %request.id, kind = kind.as_str(), "request sent");

    let (title, notification) = match kind {
        RequestKind::Connection => ("New connection request", NotificationKind::ConnectionRequest),
        RequestKind::Mentorship => ("New mentorship request", NotificationKind::MentorshipRequest),
    };
    let body = format::truncate(&request.message, 100);
    notify_or_log(&db_pool, &tx, owner.id, notification, title, &body).await;

    Ok((StatusCode::CREATED, Json(json!({ "id": request.id }))))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_requests(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
) -> AppResult<Json<Vec<RequestView>>> {
    let now = OffsetDateTime::now_utc();
    let views = Request::involving(&db_pool, viewer)
        .await?
        .into_iter()
        .map(|r| RequestView {
            id: r.id,
            kind: r.kind,
            status: r.status,
            incoming: r.target == viewer,
            counterpart: r.counterpart(viewer),
            sent: format::relative_time(r.created_at, now),
            message: r.message,
        })
        .collect();
    Ok(Json(views))
}

async fn act(db_pool: &SqlitePool, viewer: Uuid, id: Uuid, action: Action) -> AppResult<Request> {
    let Some(mut request) = Request::load(db_pool, id).await? else {
        return Err(Rejection::NotFound("request").into());
    };
    if request.target != viewer {
        if request.requester != viewer {
            return Err(Rejection::NotFound("request").into());
        }
        return Err(Rejection::Forbidden("only the recipient can answer a request").into());
    }
    if !request.settle(db_pool, action).await? {
        return Err(Rejection::Conflict("request is no longer pending").into());
    }
    info!(%id, status = %request.status, "request settled");
    Ok(request)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn accept(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let request = act(&db_pool, viewer, id, Action::Accept).await?;
    Ok(Json(json!({ "status": request.status })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn decline(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let request = act(&db_pool, viewer, id, Action::Decline).await?;
    Ok(Json(json!({ "status": request.status })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn cancel(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let Some(request) = Request::load(&db_pool, id).await? else {
        return Err(Rejection::NotFound("request").into());
    };
    if request.requester != viewer && request.target != viewer {
        return Err(Rejection::NotFound("request").into());
    }
    if !request.withdraw(&db_pool).await? {
        return Err(Rejection::Conflict("request is no longer pending").into());
    }
    info!(%id, "request withdrawn");
    Ok(StatusCode::NO_CONTENT)
}
