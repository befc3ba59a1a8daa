use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    db,
    validate::{self, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS, ValidationErrors},
};

/// How long a posting stays open unless the poster says otherwise.
pub const DEFAULT_LIFETIME: Duration = Duration::days(90);
pub const MAX_LIFETIME_DAYS: i64 = 365;
pub const MAX_TAGS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Experience {
    Entry,
    Mid,
    Senior,
    Executive,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job {0} `{1}`")]
pub struct UnknownValue(&'static str, String);

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::FullTime => "full-time",
            JobType::PartTime => "part-time",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
        }
    }
}

impl FromStr for JobType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-time" => Ok(JobType::FullTime),
            "part-time" => Ok(JobType::PartTime),
            "contract" => Ok(JobType::Contract),
            "internship" => Ok(JobType::Internship),
            other => Err(UnknownValue("type", other.to_owned())),
        }
    }
}

impl Experience {
    pub fn as_str(self) -> &'static str {
        match self {
            Experience::Entry => "entry",
            Experience::Mid => "mid",
            Experience::Senior => "senior",
            Experience::Executive => "executive",
        }
    }
}

impl FromStr for Experience {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(Experience::Entry),
            "mid" => Ok(Experience::Mid),
            "senior" => Ok(Experience::Senior),
            "executive" => Ok(Experience::Executive),
            other => Err(UnknownValue("experience", other.to_owned())),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct JobRow {
    id: String,
    posted_by: String,
    title: String,
    company: String,
    description: String,
    requirements: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    job_type: String,
    experience: String,
    remote: bool,
    application_url: Option<String>,
    contact_email: Option<String>,
    tags: String,
    posted_at: i64,
    expires_at: i64,
    active: bool,
}

pub(super) const COLUMNS: &str = "id,posted_by,title,company,description,requirements,location,salary,\
    job_type,experience,remote,application_url,contact_email,tags,posted_at,expires_at,active";

/// A job posting shared on the board by one alumnus.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub company: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: JobType,
    pub experience: Experience,
    pub remote: bool,
    pub application_url: Option<String>,
    pub contact_email: Option<String>,
    pub tags: Vec<String>,
    pub posted_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub active: bool,
}

impl TryFrom<JobRow> for Job {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> anyhow::Result<Job> {
        Ok(Job {
            id: Uuid::parse_str(&row.id)?,
            posted_by: Uuid::parse_str(&row.posted_by)?,
            title: row.title,
            company: row.company,
            description: row.description,
            requirements: row.requirements,
            location: row.location,
            salary: row.salary,
            job_type: row.job_type.parse()?,
            experience: row.experience.parse()?,
            remote: row.remote,
            application_url: row.application_url,
            contact_email: row.contact_email,
            tags: serde_json::from_str(&row.tags).context("job tags")?,
            posted_at: db::from_millis(row.posted_at)?,
            expires_at: db::from_millis(row.expires_at)?,
            active: row.active,
        })
    }
}

impl Job {
    pub async fn load(db_pool: &SqlitePool, id: Uuid) -> anyhow::Result<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM jobs WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(db_pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    pub async fn insert(&self, db_pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO jobs ({COLUMNS}) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)"
        ))
        .bind(self.id.to_string())
        .bind(self.posted_by.to_string())
        .bind(&self.title)
        .bind(&self.company)
        .bind(&self.description)
        .bind(&self.requirements)
        .bind(&self.location)
        .bind(&self.salary)
        .bind(self.job_type.as_str())
        .bind(self.experience.as_str())
        .bind(self.remote)
        .bind(&self.application_url)
        .bind(&self.contact_email)
        .bind(serde_json::to_string(&self.tags)?)
        .bind(db::to_millis(self.posted_at))
        .bind(db::to_millis(self.expires_at))
        .bind(self.active)
        .execute(db_pool)
        .await?;
        Ok(())
    }

    /// Takes the posting off the board; `false` if it was already closed.
    pub async fn close(&mut self, db_pool: &SqlitePool) -> anyhow::Result<bool> {
        let changed = sqlx::query("UPDATE jobs SET active=0 WHERE id=? AND active=1")
            .bind(self.id.to_string())
            .execute(db_pool)
            .await?
            .rows_affected();
        self.active = false;
        Ok(changed == 1)
    }

    /// Active and not yet expired.
    pub fn is_open(&self, now: OffsetDateTime) -> bool {
        self.active && self.expires_at > now
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        validate::required_text(&mut errors, "title", "Job title", &self.title, MAX_TITLE_CHARS);
        validate::required_text(&mut errors, "company", "Company", &self.company, MAX_TITLE_CHARS);
        validate::required_text(
            &mut errors,
            "description",
            "Description",
            &self.description,
            MAX_DESCRIPTION_CHARS,
        );
        if let Some(requirements) = &self.requirements {
            if requirements.chars().count() > MAX_DESCRIPTION_CHARS {
                errors.push(
                    "requirements",
                    format!("Requirements are too long (max {MAX_DESCRIPTION_CHARS} characters)"),
                );
            }
        }
        validate::short_text(&mut errors, "location", "Location", self.location.as_deref().unwrap_or_default());
        validate::short_text(&mut errors, "salary", "Salary", self.salary.as_deref().unwrap_or_default());
        validate::url(&mut errors, "applicationUrl", self.application_url.as_deref().unwrap_or_default());
        validate::optional_email(&mut errors, "contactEmail", self.contact_email.as_deref().unwrap_or_default());
        if self.tags.len() > MAX_TAGS {
            errors.push("tags", format!("At most {MAX_TAGS} tags"));
        }
        if self.expires_at <= self.posted_at {
            errors.push("expiresInDays", "A posting must stay open at least one day");
        }
        errors.into_result()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::profiles::model::tests::sample;

    pub(crate) fn posting(posted_by: Uuid, title: &str) -> Job {
        let posted_at = OffsetDateTime::now_utc();
        Job {
            id: Uuid::now_v7(),
            posted_by,
            title: title.to_owned(),
            company: "Acme".to_owned(),
            description: "Build things".to_owned(),
            requirements: None,
            location: Some("Kampala".to_owned()),
            salary: None,
            job_type: JobType::FullTime,
            experience: Experience::Mid,
            remote: false,
            application_url: None,
            contact_email: None,
            tags: vec!["rust".to_owned()],
            posted_at,
            expires_at: posted_at + DEFAULT_LIFETIME,
            active: true,
        }
    }

    #[test]
    fn parses_stored_values() {
        assert_eq!("part-time".parse::<JobType>().unwrap(), JobType::PartTime);
        assert_eq!("executive".parse::<Experience>().unwrap(), Experience::Executive);
        assert!("gig".parse::<JobType>().is_err());
        assert_eq!(serde_json::to_value(JobType::FullTime).unwrap(), "full-time");
    }

    #[test]
    fn validation_collects_fields() {
        let mut job = posting(Uuid::now_v7(), " ");
        job.contact_email = Some("hr@".into());
        job.application_url = Some("not a url".into());
        job.expires_at = job.posted_at;
        let fields: Vec<_> = job.validate().unwrap_err().0.into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["title", "applicationUrl", "contactEmail", "expiresInDays"]);
    }

    #[tokio::test]
    async fn insert_load_and_close() {
        let pool = db::memory().await.unwrap();
        let jane = sample("Jane Doe", "jane@example.com");
        jane.insert(&pool).await.unwrap();

        let job = posting(jane.id, "Backend Engineer");
        job.insert(&pool).await.unwrap();
        let mut loaded = Job::load(&pool, job.id).await.unwrap().unwrap();
        assert_eq!(loaded.tags, ["rust"]);
        assert!(loaded.is_open(OffsetDateTime::now_utc()));
        assert!(!loaded.is_open(job.expires_at + Duration::SECOND));

        assert!(loaded.close(&pool).await.unwrap());
        assert!(!loaded.close(&pool).await.unwrap());
        assert!(!Job::load(&pool, job.id).await.unwrap().unwrap().active);
    }
}
