//! Form-field checks for profile edits and chat input.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+._%\-]{1,256}@[A-Za-z0-9][A-Za-z0-9\-]{0,64}(\.[A-Za-z0-9][A-Za-z0-9\-]{0,25})+$")
        .expect("email pattern")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("phone pattern"));
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s'.\-]{2,50}$").expect("name pattern"));
static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?linkedin\.com/in/[a-zA-Z0-9\-]+/?$").expect("linkedin pattern")
});
static GITHUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?github\.com/[a-zA-Z0-9\-]+/?$").expect("github pattern")
});
static WEBSITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}(/.*)?$").expect("website pattern")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

pub const MIN_GRADUATION_YEAR: i32 = 1950;
pub const MAX_GRADUATION_YEAR: i32 = 2030;
pub const MAX_BIO_CHARS: usize = 500;
pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every failure found while checking a form.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError { field, message: message.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn chars(s: &str) -> usize {
    s.chars().count()
}

pub fn email(errors: &mut ValidationErrors, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.push("email", "Email is required");
    } else {
        optional_email(errors, "email", value);
    }
}

/// An email address that may be left blank, such as a posting's contact.
pub fn optional_email(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    if !EMAIL.is_match(value) {
        errors.push(field, "Please enter a valid email address");
    } else if chars(value) > 100 {
        errors.push(field, "Email address is too long");
    }
}

pub fn full_name(errors: &mut ValidationErrors, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.push("fullName", "Full name is required");
    } else if chars(value) < 2 {
        errors.push("fullName", "Full name must be at least 2 characters long");
    } else if chars(value) > 50 {
        errors.push("fullName", "Full name is too long (max 50 characters)");
    } else if !NAME.is_match(value) {
        errors.push("fullName", "Full name contains invalid characters");
    }
}

/// Optional; spaces are ignored.
pub fn phone(errors: &mut ValidationErrors, value: &str) {
    let compact = WHITESPACE.replace_all(value.trim(), "");
    if !compact.is_empty() && !PHONE.is_match(&compact) {
        errors.push("phone", "Please enter a valid phone number");
    }
}

pub fn graduation_year(errors: &mut ValidationErrors, year: i32) {
    if !(MIN_GRADUATION_YEAR..=MAX_GRADUATION_YEAR).contains(&year) {
        errors.push(
            "graduationYear",
            format!("Graduation year must be between {MIN_GRADUATION_YEAR} and {MAX_GRADUATION_YEAR}"),
        );
    }
}

pub fn major(errors: &mut ValidationErrors, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.push("major", "Major is required");
    } else if chars(value) < 2 {
        errors.push("major", "Major must be at least 2 characters long");
    } else if chars(value) > 100 {
        errors.push("major", "Major name is too long (max 100 characters)");
    }
}

pub fn bio(errors: &mut ValidationErrors, value: &str) {
    if chars(value.trim()) > MAX_BIO_CHARS {
        errors.push("bio", format!("Bio is too long (max {MAX_BIO_CHARS} characters)"));
    }
}

/// Job title, company and similar optional short fields.
pub fn short_text(errors: &mut ValidationErrors, field: &'static str, label: &str, value: &str) {
    if chars(value.trim()) > 100 {
        errors.push(field, format!("{label} is too long (max 100 characters)"));
    }
}

/// Mandatory free text such as a posting title or event description.
pub fn required_text(errors: &mut ValidationErrors, field: &'static str, label: &str, value: &str, max: usize) {
    let len = chars(value.trim());
    if len == 0 {
        errors.push(field, format!("{label} is required"));
    } else if len > max {
        errors.push(field, format!("{label} is too long (max {max} characters)"));
    }
}

/// Optional web link, e.g. where to apply or join online.
pub fn url(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !WEBSITE.is_match(value) {
        errors.push(field, "Please enter a valid website URL");
    }
}

/// A social link, checked against the pattern for its label.
pub fn social_link(errors: &mut ValidationErrors, label: &str, url: &str) {
    let url = url.trim();
    if url.is_empty() {
        return;
    }
    let (pattern, message) = match label.to_ascii_lowercase().as_str() {
        "linkedin" => (&*LINKEDIN, "Please enter a valid LinkedIn profile URL"),
        "github" => (&*GITHUB, "Please enter a valid GitHub profile URL"),
        _ => (&*WEBSITE, "Please enter a valid website URL"),
    };
    if !pattern.is_match(url) {
        errors.push("socialLinks", message);
    }
}

pub fn message_text(errors: &mut ValidationErrors, value: &str) {
    let len = chars(value.trim());
    if len == 0 {
        errors.push("payload", "Message cannot be empty");
    } else if len > MAX_MESSAGE_CHARS {
        errors.push("payload", format!("Message is too long (max {MAX_MESSAGE_CHARS} characters)"));
    }
}
