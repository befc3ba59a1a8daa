use axum::{
    Json, debug_handler,
    extract::{Query, State},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult, connections::Relations, db,
    privacy::{Attribute, Preference, Relationship},
    viewer::Viewer,
};

use super::{
    Profile, ProfileCard,
    model::{COLUMNS, ProfileRow},
    view::Gate,
};

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;
/// Rows pulled per round trip while collecting visible hits.
const BATCH: i64 = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchQuery {
    q: Option<String>,
    major: Option<String>,
    year: Option<i32>,
    year_from: Option<i32>,
    year_to: Option<i32>,
    location: Option<String>,
    company: Option<String>,
    skill: Option<String>,
    #[serde(default)]
    mentoring: bool,
    limit: Option<u32>,
    #[serde(default)]
    offset: u32,
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

impl SearchQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize
    }

    fn year_range(&self) -> (Option<i32>, Option<i32>) {
        match self.year {
            Some(year) => (Some(year), Some(year)),
            None => (self.year_from, self.year_to),
        }
    }

    /// Whether `owner` matches, looking only at what `gate` lets through.
    fn matches(&self, owner: &Profile, gate: &Gate) -> bool {
        if let Some(major) = given(&self.major) {
            if !gate.shows(Attribute::Major) || !owner.major.eq_ignore_ascii_case(major) {
                return false;
            }
        }
        let (from, to) = self.year_range();
        if from.is_some() || to.is_some() {
            let year = owner.graduation_year;
            if !gate.shows(Attribute::GraduationYear)
                || from.is_some_and(|from| year < from)
                || to.is_some_and(|to| year > to)
            {
                return false;
            }
        }
        if let Some(location) = given(&self.location) {
            if !gate.shows(Attribute::Location) || !contains(owner.location.as_deref(), location) {
                return false;
            }
        }
        if let Some(company) = given(&self.company) {
            if !gate.shows(Attribute::Company) || !contains(owner.company.as_deref(), company) {
                return false;
            }
        }
        if let Some(skill) = given(&self.skill) {
            if !gate.shows(Attribute::Skills) || !owner.skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                return false;
            }
        }
        if self.mentoring && !owner.privacy.allows(Preference::AllowMentorRequests) {
            return false;
        }
        let Some(needle) = given(&self.q) else {
            return true;
        };
        [
            (Attribute::Name, Some(owner.full_name.as_str())),
            (Attribute::Major, Some(owner.major.as_str())),
            (Attribute::Company, owner.company.as_deref()),
            (Attribute::CurrentJob, owner.current_job.as_deref()),
        ]
        .into_iter()
        .any(|(attr, text)| gate.shows(attr) && contains(text, needle))
    }
}

/// Directory candidates on raw values: searchable, not the viewer, no block
/// either way. Visibility of the matched fields is checked afterwards.
async fn candidates(
    db_pool: &SqlitePool,
    viewer: Uuid,
    query: &SearchQuery,
    offset: i64,
) -> anyhow::Result<Vec<Profile>> {
    let (from, to) = query.year_range();
    let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
        r"SELECT {COLUMNS} FROM profiles
        WHERE id <> ?1
          AND coalesce(json_extract(privacy, '$.allowAlumniSearch'),
                       json_extract(privacy, '$.allow_alumni_search'), 1) = 1
          AND id NOT IN (SELECT blocked FROM blocks WHERE blocker = ?1
                         UNION SELECT blocker FROM blocks WHERE blocked = ?1)
          AND (?2 IS NULL OR lower(major) = lower(?2))
          AND (?3 IS NULL OR graduation_year >= ?3)
          AND (?4 IS NULL OR graduation_year <= ?4)
          AND (?5 IS NULL OR full_name LIKE ?5 ESCAPE '\' OR major LIKE ?5 ESCAPE '\'
               OR company LIKE ?5 ESCAPE '\' OR current_job LIKE ?5 ESCAPE '\')
          AND (?6 IS NULL OR location LIKE ?6 ESCAPE '\')
          AND (?7 IS NULL OR company LIKE ?7 ESCAPE '\')
          AND (?8 IS NULL OR EXISTS (SELECT 1 FROM json_each(skills) WHERE lower(value) = lower(?8)))
          AND (?9 = 0 OR coalesce(json_extract(privacy, '$.allowMentorRequests'),
                                  json_extract(privacy, '$.allow_mentor_requests'), 0) = 1)
        ORDER BY full_name, id
        LIMIT ?10 OFFSET ?11"
    ))
    .bind(viewer.to_string())
    .bind(given(&query.major))
    .bind(from)
    .bind(to)
    .bind(given(&query.q).map(db::like_pattern))
    .bind(given(&query.location).map(db::like_pattern))
    .bind(given(&query.company).map(db::like_pattern))
    .bind(given(&query.skill))
    .bind(query.mentoring)
    .bind(BATCH)
    .bind(offset)
    .fetch_all(db_pool)
    .await?;
    rows.into_iter().map(Profile::try_from).collect()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn search(
    State(db_pool): State<SqlitePool>,
    Viewer(viewer): Viewer,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<ProfileCard>>> {
    let relations = Relations::load(&db_pool, viewer).await?;
    let limit = query.limit();
    let mut skip = query.offset as usize;
    let mut cards = Vec::with_capacity(limit);
    let mut scanned = 0;

    loop {
        let batch = candidates(&db_pool, viewer, &query, scanned).await?;
        let exhausted = (batch.len() as i64) < BATCH;
        scanned += batch.len() as i64;

        for owner in &batch {
            let relationship = relations.of(owner.id);
            if matches!(relationship, Relationship::Myself | Relationship::Blocked)
                || !owner.privacy.allows(Preference::AllowAlumniSearch)
            {
                continue;
            }
            if !query.matches(owner, &Gate::new(viewer, owner, relationship)) {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }
            cards.push(ProfileCard::build(viewer, owner, relationship));
            if cards.len() == limit {
                return Ok(Json(cards));
            }
        }
        if exhausted {
            return Ok(Json(cards));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::model::tests::sample;

    fn text(q: &str) -> SearchQuery {
        SearchQuery { q: Some(q.to_owned()), ..SearchQuery::default() }
    }

    #[test]
    fn text_matches_only_visible_fields() {
        let mut owner = sample("Jane Doe", "jane@example.com");
        owner.company = Some("Acme Robotics".into());
        let viewer = Uuid::now_v7();

        let public = Gate::new(viewer, &owner, Relationship::Public);
        let connection = Gate::new(viewer, &owner, Relationship::Connection);
        assert!(!text("acme").matches(&owner, &public));
        assert!(text("acme").matches(&owner, &connection));
        assert!(text("JANE").matches(&owner, &public));
        assert!(text("   ").matches(&owner, &public));
    }

    #[test]
    fn major_and_year_are_exact() {
        let owner = sample("Jane Doe", "jane@example.com");
        let gate = Gate::new(Uuid::now_v7(), &owner, Relationship::Public);
        let exact = SearchQuery {
            major: Some("computer science".into()),
            year: Some(2019),
            ..SearchQuery::default()
        };
        assert!(exact.matches(&owner, &gate));
        assert!(!SearchQuery { major: Some("Computer".into()), ..SearchQuery::default() }.matches(&owner, &gate));
        assert!(!SearchQuery { year: Some(2020), ..SearchQuery::default() }.matches(&owner, &gate));
        assert!(SearchQuery { year_from: Some(2015), year_to: Some(2019), ..SearchQuery::default() }
            .matches(&owner, &gate));
    }

    #[test]
    fn hidden_location_cannot_be_filtered_on() {
        let mut owner = sample("Jane Doe", "jane@example.com");
        owner.location = Some("Kampala".into());
        let viewer = Uuid::now_v7();
        let by_city = SearchQuery { location: Some("kampala".into()), ..SearchQuery::default() };
        assert!(!by_city.matches(&owner, &Gate::new(viewer, &owner, Relationship::Connection)));
        owner.privacy.set("location", true);
        assert!(by_city.matches(&owner, &Gate::new(viewer, &owner, Relationship::Connection)));
    }

    #[tokio::test]
    async fn candidates_are_filtered_in_the_database() {
        let pool = db::memory().await.unwrap();
        let viewer = sample("Viewer", "viewer@example.com");
        viewer.insert(&pool).await.unwrap();
        let mut rust = sample("Ada Rust", "ada@example.com");
        rust.skills = vec!["Rust".into()];
        rust.insert(&pool).await.unwrap();
        let mut hidden = sample("Hidden Person", "hidden@example.com");
        hidden.privacy.set("allowAlumniSearch", false);
        hidden.insert(&pool).await.unwrap();
        let legacy = sample("Legacy Hidden", "legacy@example.com");
        legacy.insert(&pool).await.unwrap();
        sqlx::query(r#"UPDATE profiles SET privacy='{"allow_alumni_search": false}' WHERE id=?"#)
            .bind(legacy.id.to_string())
            .execute(&pool)
            .await
            .unwrap();
        let percent = sample("100% Alum", "percent@example.com");
        percent.insert(&pool).await.unwrap();

        let everyone = candidates(&pool, viewer.id, &SearchQuery::default(), 0).await.unwrap();
        let names: Vec<_> = everyone.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, ["100% Alum", "Ada Rust"]);

        let skilled = SearchQuery { skill: Some("rust".into()), ..SearchQuery::default() };
        let found = candidates(&pool, viewer.id, &skilled, 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, rust.id);

        let found = candidates(&pool, viewer.id, &text("%"), 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, percent.id);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(SearchQuery::default().limit(), DEFAULT_LIMIT as usize);
        assert_eq!(SearchQuery { limit: Some(1000), ..SearchQuery::default() }.limit(), MAX_LIMIT as usize);
        assert_eq!(SearchQuery { limit: Some(0), ..SearchQuery::default() }.limit(), 1);
    }
}
