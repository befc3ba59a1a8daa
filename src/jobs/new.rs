use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppResult, Event, Rejection,
    connections::Relations,
    format,
    notifications::notify_or_log,
    privacy::NotificationKind,
    profiles::non_blank,
    validate::ValidationErrors,
    viewer::Viewer,
};

use super::model::{DEFAULT_LIFETIME, Experience, Job, JobType, MAX_LIFETIME_DAYS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewJob {
    title: String,
    company: String,
    description: String,
    requirements: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    job_type: JobType,
    experience: Experience,
    #[serde(default)]
    remote: bool,
    application_url: Option<String>,
    contact_email: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    expires_in_days: Option<i64>,
}

impl NewJob {
    fn into_job(self, posted_by: Uuid, now: OffsetDateTime) -> Result<Job, ValidationErrors> {
        let lifetime = match self.expires_in_days {
            None => DEFAULT_LIFETIME,
            Some(days) if (1..=MAX_LIFETIME_DAYS).contains(&days) => Duration::days(days),
            Some(_) => {
                let mut errors = ValidationErrors::default();
                errors.push("expiresInDays", format!("Must be between 1 and {MAX_LIFETIME_DAYS} days"));
                return Err(errors);
            }
        };
        let job = Job {
            id: Uuid::now_v7(),
            posted_by,
            title: self.title.trim().to_owned(),
            company: self.company.trim().to_owned(),
            description: self.description.trim().to_owned(),
            requirements: non_blank(self.requirements),
            location: non_blank(self.location),
            salary: non_blank(self.salary),
            job_type: self.job_type,
            experience: self.experience,
            remote: self.remote,
            application_url: non_blank(self.application_url),
            contact_email: non_blank(self.contact_email),
            tags: self
                .tags
                .into_iter()
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty())
                .collect(),
            posted_at: now,
            expires_at: now + lifetime,
            active: true,
        };
        job.validate()?;
        Ok(job)
    }
}

/// Posts a job and tells the poster's connections about it.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_job(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Event>>,
    Viewer(viewer): Viewer,
    Json(form): Json<NewJob>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let job = form.into_job(viewer, OffsetDateTime::now_utc()).map_err(Rejection::from)?;
    job.insert(&db_pool).await?;
    info!(id = %job.id, job_type = job.job_type.as_str(), "job posted");

    let title = format!("New job: {} at {}", job.title, job.company);
    let body = format::truncate(&job.description, 100);
    let mut notified = 0u32;
    let relations = Relations::load(&db_pool, viewer).await?;
    for recipient in relations.connections() {
        if notify_or_log(&db_pool, &tx, recipient, NotificationKind::JobOpportunity, &title, &body).await {
            notified += 1;
        }
    }

    Ok((StatusCode::CREATED, Json(json!({ "id": job.id, "notified": notified }))))
}
