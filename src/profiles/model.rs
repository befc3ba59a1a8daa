use std::collections::BTreeMap;

use anyhow::Context;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db,
    privacy::{Attribute, PrivacySettings},
    validate::{self, ValidationErrors},
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct ProfileRow {
    id: String,
    full_name: String,
    email: String,
    phone: Option<String>,
    location: Option<String>,
    current_job: Option<String>,
    company: Option<String>,
    skills: String,
    major: String,
    graduation_year: i64,
    bio: Option<String>,
    avatar_url: Option<String>,
    social_links: String,
    privacy: String,
    created_at: i64,
    last_active: Option<i64>,
}

pub(super) const COLUMNS: &str = "id,full_name,email,phone,location,current_job,company,skills,major,\
    graduation_year,bio,avatar_url,social_links,privacy,created_at,last_active";

/// An alumnus' directory record, owned and edited by that alumnus only.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub current_job: Option<String>,
    pub company: Option<String>,
    pub skills: Vec<String>,
    pub major: String,
    pub graduation_year: i32,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: BTreeMap<String, String>,
    pub privacy: PrivacySettings,
    pub created_at: OffsetDateTime,
    pub last_active: Option<OffsetDateTime>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileRow) -> anyhow::Result<Profile> {
        Ok(Profile {
            id: Uuid::parse_str(&row.id)?,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            location: row.location,
            current_job: row.current_job,
            company: row.company,
            skills: serde_json::from_str(&row.skills).context("profile skills")?,
            major: row.major,
            graduation_year: i32::try_from(row.graduation_year)?,
            bio: row.bio,
            avatar_url: row.avatar_url,
            social_links: serde_json::from_str(&row.social_links).context("profile social links")?,
            privacy: serde_json::from_str(&row.privacy).context("profile privacy")?,
            created_at: db::from_millis(row.created_at)?,
            last_active: row.last_active.map(db::from_millis).transpose()?,
        })
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl Profile {
    pub async fn load(db_pool: &SqlitePool, id: Uuid) -> anyhow::Result<Option<Profile>> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM profiles WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(db_pool)
            .await?;
        row.map(Profile::try_from).transpose()
    }

    pub async fn privacy_of(db_pool: &SqlitePool, id: Uuid) -> anyhow::Result<PrivacySettings> {
        let (privacy,): (String,) = sqlx::query_as("SELECT privacy FROM profiles WHERE id=?")
            .bind(id.to_string())
            .fetch_one(db_pool)
            .await?;
        Ok(serde_json::from_str(&privacy)?)
    }

    pub async fn insert(&self, db_pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO profiles ({COLUMNS}) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)"
        ))
        .bind(self.id.to_string())
        .bind(&self.full_name)
        .bind(&self.email)
        .bind(&self.phone)
        .bind(&self.location)
        .bind(&self.current_job)
        .bind(&self.company)
        .bind(serde_json::to_string(&self.skills)?)
        .bind(&self.major)
        .bind(self.graduation_year)
        .bind(&self.bio)
        .bind(&self.avatar_url)
        .bind(serde_json::to_string(&self.social_links)?)
        .bind(serde_json::to_string(&self.privacy)?)
        .bind(db::to_millis(self.created_at))
        .bind(self.last_active.map(db::to_millis))
        .execute(db_pool)
        .await?;
        Ok(())
    }

    /// Writes every owner-editable field back.
    pub async fn update(&self, db_pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE profiles SET full_name=?,email=?,phone=?,location=?,current_job=?,company=?,\
             skills=?,major=?,graduation_year=?,bio=?,avatar_url=?,social_links=?,privacy=? WHERE id=?",
        )
        .bind(&self.full_name)
        .bind(&self.email)
        .bind(&self.phone)
        .bind(&self.location)
        .bind(&self.current_job)
        .bind(&self.company)
        .bind(serde_json::to_string(&self.skills)?)
        .bind(&self.major)
        .bind(self.graduation_year)
        .bind(&self.bio)
        .bind(&self.avatar_url)
        .bind(serde_json::to_string(&self.social_links)?)
        .bind(serde_json::to_string(&self.privacy)?)
        .bind(self.id.to_string())
        .execute(db_pool)
        .await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        validate::full_name(&mut errors, &self.full_name);
        validate::email(&mut errors, &self.email);
        validate::phone(&mut errors, self.phone.as_deref().unwrap_or_default());
        validate::major(&mut errors, &self.major);
        validate::graduation_year(&mut errors, self.graduation_year);
        validate::bio(&mut errors, self.bio.as_deref().unwrap_or_default());
        validate::short_text(&mut errors, "currentJob", "Job title", self.current_job.as_deref().unwrap_or_default());
        validate::short_text(&mut errors, "company", "Company name", self.company.as_deref().unwrap_or_default());
        validate::short_text(&mut errors, "location", "Location", self.location.as_deref().unwrap_or_default());
        for (label, url) in &self.social_links {
            validate::social_link(&mut errors, label, url);
        }
        errors.into_result()
    }

    /// Whether the field behind `attr` holds anything worth showing.
    pub fn has(&self, attr: Attribute) -> bool {
        use Attribute::*;
        match attr {
            Name => !self.full_name.trim().is_empty(),
            Email => !self.email.trim().is_empty(),
            Phone => filled(&self.phone),
            Location => filled(&self.location),
            CurrentJob => filled(&self.current_job),
            Company => filled(&self.company),
            GraduationYear => true,
            Major => !self.major.trim().is_empty(),
            Bio => filled(&self.bio),
            Skills => !self.skills.is_empty(),
            SocialLinks => !self.social_links.is_empty(),
            Avatar => filled(&self.avatar_url),
        }
    }

    /// The ten fields counted towards profile completion.
    pub fn completion_fields(&self) -> [bool; 10] {
        use Attribute::*;
        [Name, Avatar, Bio, Major, GraduationYear, CurrentJob, Company, Location, Phone, Skills]
            .map(|attr| self.has(attr))
    }
}
