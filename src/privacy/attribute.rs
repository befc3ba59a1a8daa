use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A profile field whose visibility is controlled by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    Name,
    Email,
    Phone,
    Location,
    CurrentJob,
    Company,
    GraduationYear,
    Major,
    Bio,
    Skills,
    SocialLinks,
    Avatar,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown profile attribute `{0}`")]
pub struct UnknownAttribute(pub String);

impl Attribute {
    pub const ALL: [Attribute; 12] = [
        Attribute::Name,
        Attribute::Email,
        Attribute::Phone,
        Attribute::Location,
        Attribute::CurrentJob,
        Attribute::Company,
        Attribute::GraduationYear,
        Attribute::Major,
        Attribute::Bio,
        Attribute::Skills,
        Attribute::SocialLinks,
        Attribute::Avatar,
    ];

    pub fn key(self) -> &'static str {
        use Attribute::*;
        match self {
            Name => "name",
            Email => "email",
            Phone => "phone",
            Location => "location",
            CurrentJob => "currentJob",
            Company => "company",
            GraduationYear => "graduationYear",
            Major => "major",
            Bio => "bio",
            Skills => "skills",
            SocialLinks => "socialLinks",
            Avatar => "avatar",
        }
    }

    /// Key under which older clients stored the flag.
    pub fn legacy_key(self) -> &'static str {
        use Attribute::*;
        match self {
            Name => "show_full_name",
            Email => "show_email",
            Phone => "show_phone",
            Location => "show_location",
            CurrentJob => "show_current_job",
            Company => "show_company",
            GraduationYear => "show_graduation_year",
            Major => "show_major",
            Bio => "show_bio",
            Skills => "show_skills",
            SocialLinks => "show_social_links",
            Avatar => "show_profile_picture",
        }
    }

    /// Visibility when the owner never set the flag. Contact details and
    /// whereabouts stay hidden until the owner opts in.
    pub fn default_visible(self) -> bool {
        use Attribute::*;
        match self {
            Name | GraduationYear | Major | Avatar | Bio | CurrentJob | Company | Skills => true,
            Email | Phone | Location | SocialLinks => false,
        }
    }

    /// Whether a stranger (no connection) may ever see this attribute.
    pub fn is_public_safe(self) -> bool {
        matches!(
            self,
            Attribute::Name | Attribute::GraduationYear | Attribute::Major | Attribute::Avatar
        )
    }
}

impl FromStr for Attribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.key() == s || attr.legacy_key() == s)
            .ok_or_else(|| UnknownAttribute(s.to_owned()))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}
