use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    format,
    privacy::{Attribute, Preference, Relationship, can_view_attr},
};

use super::Profile;

/// Longest bio shown on a directory card.
pub const CARD_BIO_CHARS: usize = 150;

/// A profile as one particular viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub relationship: Relationship,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_job: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_links: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    /// Owner only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<BTreeMap<String, bool>>,
    /// Owner only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<u8>,
}

/// A directory search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCard {
    pub id: Uuid,
    pub relationship: Relationship,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Gate bound to one (viewer, owner) pair.
pub(crate) struct Gate<'a> {
    viewer: Uuid,
    owner: &'a Profile,
    relationship: Relationship,
}

impl<'a> Gate<'a> {
    pub(crate) fn new(viewer: Uuid, owner: &'a Profile, relationship: Relationship) -> Gate<'a> {
        Gate { viewer, owner, relationship }
    }

    pub(crate) fn shows(&self, attr: Attribute) -> bool {
        self.owner.has(attr)
            && can_view_attr(attr, self.viewer, self.owner.id, self.relationship, &self.owner.privacy)
    }

    fn pick<T>(&self, attr: Attribute, value: impl FnOnce() -> T) -> Option<T> {
        self.shows(attr).then(value)
    }

    fn is_owner(&self) -> bool {
        self.viewer == self.owner.id
    }

    /// Presence is shared only if the owner opted in, and never across a block.
    fn shows_presence(&self) -> bool {
        self.is_owner()
            || (self.relationship != Relationship::Blocked
                && self.owner.privacy.allows(Preference::AllowActivityStatus))
    }
}

fn headline(job: Option<&str>, company: Option<&str>) -> Option<String> {
    match (job, company) {
        (Some(job), Some(company)) => Some(format!("{job} at {company}")),
        (Some(one), None) | (None, Some(one)) => Some(one.to_owned()),
        (None, None) => None,
    }
}

impl ProfileView {
    pub fn build(viewer: Uuid, owner: &Profile, relationship: Relationship, now: OffsetDateTime) -> ProfileView {
        use Attribute::*;
        let gate = Gate::new(viewer, owner, relationship);
        let owner_only = gate.is_owner();

        ProfileView {
            id: owner.id,
            relationship,
            name: gate.pick(Name, || owner.full_name.clone()),
            email: gate.pick(Email, || owner.email.clone()),
            phone: gate.pick(Phone, || owner.phone.clone().unwrap_or_default()),
            location: gate.pick(Location, || owner.location.clone().unwrap_or_default()),
            current_job: gate.pick(CurrentJob, || owner.current_job.clone().unwrap_or_default()),
            company: gate.pick(Company, || owner.company.clone().unwrap_or_default()),
            graduation_year: gate.pick(GraduationYear, || owner.graduation_year),
            major: gate.pick(Major, || owner.major.clone()),
            bio: gate.pick(Bio, || owner.bio.clone().unwrap_or_default()),
            skills: gate.pick(Skills, || owner.skills.clone()),
            social_links: gate.pick(SocialLinks, || owner.social_links.clone()),
            avatar_url: gate.pick(Avatar, || owner.avatar_url.clone().unwrap_or_default()),
            last_seen: gate
                .shows_presence()
                .then(|| format::last_seen(owner.last_active, now)),
            privacy: owner_only.then(|| owner.privacy.resolved()),
            completion: owner_only.then(|| format::profile_completion(&owner.completion_fields())),
        }
    }
}

impl ProfileCard {
    pub fn build(viewer: Uuid, owner: &Profile, relationship: Relationship) -> ProfileCard {
        use Attribute::*;
        let gate = Gate::new(viewer, owner, relationship);
        let job = gate.pick(CurrentJob, || owner.current_job.clone().unwrap_or_default());
        let company = gate.pick(Company, || owner.company.clone().unwrap_or_default());

        ProfileCard {
            id: owner.id,
            relationship,
            name: gate.pick(Name, || owner.full_name.clone()),
            headline: headline(job.as_deref(), company.as_deref()),
            major: gate.pick(Major, || owner.major.clone()),
            graduation_year: gate.pick(GraduationYear, || owner.graduation_year),
            bio: gate.pick(Bio, || {
                format::truncate(owner.bio.as_deref().unwrap_or_default(), CARD_BIO_CHARS)
            }),
            skills: gate.pick(Skills, || format::skills_summary(&owner.skills)).flatten(),
            avatar_url: gate.pick(Avatar, || owner.avatar_url.clone().unwrap_or_default()),
        }
    }
}
