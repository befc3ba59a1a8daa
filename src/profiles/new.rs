use std::collections::BTreeMap;

use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{AppResult, Rejection, db, privacy::PrivacySettings};

use super::{Profile, non_blank};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewProfile {
    full_name: String,
    email: String,
    major: String,
    graduation_year: i32,
    phone: Option<String>,
    location: Option<String>,
    current_job: Option<String>,
    company: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    #[serde(default)]
    social_links: BTreeMap<String, String>,
    #[serde(default)]
    privacy: PrivacySettings,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_profile(
    State(db_pool): State<SqlitePool>,
    Json(form): Json<NewProfile>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let profile = Profile {
        id: Uuid::now_v7(),
        full_name: form.full_name.trim().to_owned(),
        email: form.email.trim().to_lowercase(),
        phone: non_blank(form.phone),
        location: non_blank(form.location),
        current_job: non_blank(form.current_job),
        company: non_blank(form.company),
        skills: form.skills,
        major: form.major.trim().to_owned(),
        graduation_year: form.graduation_year,
        bio: non_blank(form.bio),
        avatar_url: non_blank(form.avatar_url),
        social_links: form.social_links,
        privacy: form.privacy,
        created_at: OffsetDateTime::now_utc(),
        last_active: None,
    };
    profile.validate().map_err(Rejection::from)?;

    if let Err(err) = profile.insert(&db_pool).await {
        if db::is_unique_violation(&err) {
            return Err(Rejection::Conflict("email already registered").into());
        }
        return Err(err.into());
    }
    info!(id = %profile.id, "profile created");

    Ok((StatusCode::CREATED, Json(json!({ "id": profile.id }))))
}
