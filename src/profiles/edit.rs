use std::collections::BTreeMap;

use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{AppResult, Rejection, db, privacy::Relationship, viewer::Viewer};

use super::{Profile, ProfileView, non_blank};

/// Fields left out stay as they are; an empty string clears an optional field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfilePatch {
    full_name: Option<String>,
    email: Option<String>,
    major: Option<String>,
    graduation_year: Option<i32>,
    phone: Option<String>,
    location: Option<String>,
    current_job: Option<String>,
    company: Option<String>,
    skills: Option<Vec<String>>,
    bio: Option<String>,
    avatar_url: Option<String>,
    social_links: Option<BTreeMap<String, String>>,
}

impl ProfilePatch {
    fn apply(self, profile: &mut Profile) {
        if let Some(full_name) = self.full_name {
            profile.full_name = full_name.trim().to_owned();
        }
        if let Some(email) = self.email {
            profile.email = email.trim().to_lowercase();
        }
        if let Some(major) = self.major {
            profile.major = major.trim().to_owned();
        }
        if let Some(year) = self.graduation_year {
            profile.graduation_year = year;
        }
        for (slot, value) in [
            (&mut profile.phone, self.phone),
            (&mut profile.location, self.location),
            (&mut profile.current_job, self.current_job),
            (&mut profile.company, self.company),
            (&mut profile.bio, self.bio),
            (&mut profile.avatar_url, self.avatar_url),
        ] {
            if value.is_some() {
                *slot = non_blank(value);
            }
        }
        if let Some(skills) = self.skills {
            profile.skills = skills
                .into_iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(links) = self.social_links {
            profile.social_links = links;
        }
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn edit_profile(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProfilePatch>,
) -> AppResult<Json<ProfileView>> {
    if id != viewer {
        return Err(Rejection::Forbidden("only the owner can edit a profile").into());
    }
    let Some(mut profile) = Profile::load(&db_pool, id).await? else {
        return Err(Rejection::NotFound("profile").into());
    };

    patch.apply(&mut profile);
    profile.validate().map_err(Rejection::from)?;

    if let Err(err) = profile.update(&db_pool).await {
        if db::is_unique_violation(&err) {
            return Err(Rejection::Conflict("email already registered").into());
        }
        return Err(err.into());
    }
    info!(%id, "profile updated");

    Ok(Json(ProfileView::build(
        viewer,
        &profile,
        Relationship::Myself,
        OffsetDateTime::now_utc(),
    )))
}
