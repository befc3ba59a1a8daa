use axum::{
    Json, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppResult, Rejection, connections, db, format,
    privacy::Relationship,
    viewer::Viewer,
};

use super::model::{COLUMNS, Experience, Job, JobRow, JobType};

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;

/// A posting as shown on the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub company: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    pub location: String,
    pub salary: String,
    pub job_type: JobType,
    pub experience: Experience,
    pub remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub tags: Vec<String>,
    pub posted: String,
    pub expires: String,
    pub open: bool,
}

fn location_line(location: Option<&str>, remote: bool) -> String {
    match (location, remote) {
        (Some(location), true) => format!("{location} (Remote)"),
        (None, true) => "Remote".to_owned(),
        (Some(location), false) => location.to_owned(),
        (None, false) => "Location not specified".to_owned(),
    }
}

impl JobView {
    pub fn build(job: Job, now: OffsetDateTime) -> JobView {
        JobView {
            location: location_line(job.location.as_deref(), job.remote),
            salary: job.salary.clone().unwrap_or_else(|| "Salary not specified".to_owned()),
            posted: format::relative_time(job.posted_at, now),
            expires: format::days_left(job.expires_at, now),
            open: job.is_open(now),
            id: job.id,
            posted_by: job.posted_by,
            title: job.title,
            company: job.company,
            description: job.description,
            requirements: job.requirements,
            job_type: job.job_type,
            experience: job.experience,
            remote: job.remote,
            application_url: job.application_url,
            contact_email: job.contact_email,
            tags: job.tags,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobQuery {
    q: Option<String>,
    #[serde(rename = "type")]
    job_type: Option<JobType>,
    experience: Option<Experience>,
    location: Option<String>,
    company: Option<String>,
    remote: Option<bool>,
    limit: Option<u32>,
    #[serde(default)]
    offset: u32,
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Open postings matching `query`, newest first, never from across a block.
pub(crate) async fn open_jobs(
    db_pool: &SqlitePool,
    viewer: Uuid,
    query: &JobQuery,
    now: OffsetDateTime,
) -> anyhow::Result<Vec<Job>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let rows: Vec<JobRow> = sqlx::query_as(&format!(
        r"SELECT {COLUMNS} FROM jobs
        WHERE active = 1 AND expires_at > ?2
          AND posted_by NOT IN (SELECT blocked FROM blocks WHERE blocker = ?1
                                UNION SELECT blocker FROM blocks WHERE blocked = ?1)
          AND (?3 IS NULL OR title LIKE ?3 ESCAPE '\' OR company LIKE ?3 ESCAPE '\'
               OR description LIKE ?3 ESCAPE '\')
          AND (?4 IS NULL OR job_type = ?4)
          AND (?5 IS NULL OR experience = ?5)
          AND (?6 IS NULL OR location LIKE ?6 ESCAPE '\')
          AND (?7 IS NULL OR company LIKE ?7 ESCAPE '\')
          AND (?8 IS NULL OR remote = ?8)
        ORDER BY posted_at DESC, id DESC
        LIMIT ?9 OFFSET ?10"
    ))
    .bind(viewer.to_string())
    .bind(db::to_millis(now))
    .bind(given(&query.q).map(db::like_pattern))
    .bind(query.job_type.map(JobType::as_str))
    .bind(query.experience.map(Experience::as_str))
    .bind(given(&query.location).map(db::like_pattern))
    .bind(given(&query.company).map(db::like_pattern))
    .bind(query.remote)
    .bind(limit)
    .bind(query.offset)
    .fetch_all(db_pool)
    .await?;
    rows.into_iter().map(Job::try_from).collect()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_jobs(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Query(query): Query<JobQuery>,
) -> AppResult<Json<Vec<JobView>>> {
    let now = OffsetDateTime::now_utc();
    let jobs = open_jobs(&db_pool, viewer, &query, now).await?;
    Ok(Json(jobs.into_iter().map(|job| JobView::build(job, now)).collect()))
}

/// A posting the viewer may see: it exists and no block separates them
/// from the poster. Closed postings stay visible so old links still resolve.
async fn visible(db_pool: &SqlitePool, viewer: Uuid, id: Uuid) -> AppResult<Job> {
    let Some(job) = Job::load(db_pool, id).await? else {
        return Err(Rejection::NotFound("job").into());
    };
    if connections::resolve(db_pool, viewer, job.posted_by).await? == Relationship::Blocked {
        return Err(Rejection::NotFound("job").into());
    }
    Ok(job)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn job(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobView>> {
    let job = visible(&db_pool, viewer, id).await?;
    Ok(Json(JobView::build(job, OffsetDateTime::now_utc())))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn close_job(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut job = visible(&db_pool, viewer, id).await?;
    if job.posted_by != viewer {
        return Err(Rejection::Forbidden("only the poster can close a job").into());
    }
    if job.close(&db_pool).await? {
        info!(%id, "job closed");
    }
    Ok(StatusCode::NO_CONTENT)
}
