//! Maps backend failures to what the user should be told.
//!
//! The table is keyed by the error codes the identity and document stores
//! report; anything else is classified from its message text.

use serde::Serialize;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Network,
    Authentication,
    Database,
    Validation,
    Permission,
    File,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Logged only.
    Low,
    /// Short message to the user.
    Medium,
    /// Message, with a retry prompt when retryable.
    High,
    /// Message, and the session may be ended.
    Critical,
}

/// How the client should surface a classified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Feedback {
    LogOnly,
    Toast,
    RetryPrompt,
    ForceLogout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: Category,
    pub severity: Severity,
    pub user_message: &'static str,
    pub retryable: bool,
    pub logout: bool,
}

impl Classification {
    const fn new(
        category: Category,
        severity: Severity,
        user_message: &'static str,
        retryable: bool,
        logout: bool,
    ) -> Self {
        Self { category, severity, user_message, retryable, logout }
    }

    /// Critical auth or permission failures end the session even when the
    /// entry itself does not ask for it.
    pub fn forces_logout(&self) -> bool {
        self.logout
            || (self.severity == Severity::Critical
                && matches!(self.category, Category::Authentication | Category::Permission))
    }

    pub fn feedback(&self) -> Feedback {
        if self.forces_logout() {
            return Feedback::ForceLogout;
        }
        match self.severity {
            Severity::Low => Feedback::LogOnly,
            Severity::Medium | Severity::Critical => Feedback::Toast,
            Severity::High if self.retryable => Feedback::RetryPrompt,
            Severity::High => Feedback::Toast,
        }
    }
}

use Category::*;
use Severity::*;

static TABLE: &[(&str, Classification)] = &[
    ("ERROR_INVALID_EMAIL", Classification::new(Authentication, Medium, "Please enter a valid email address", false, false)),
    ("ERROR_WRONG_PASSWORD", Classification::new(Authentication, Medium, "Incorrect password. Please try again.", false, false)),
    ("ERROR_USER_NOT_FOUND", Classification::new(Authentication, Medium, "No account found with this email address", false, false)),
    ("ERROR_USER_DISABLED", Classification::new(Authentication, High, "Your account has been disabled. Please contact support.", false, false)),
    ("ERROR_TOO_MANY_REQUESTS", Classification::new(Authentication, High, "Too many failed attempts. Please try again later.", true, false)),
    ("ERROR_OPERATION_NOT_ALLOWED", Classification::new(Authentication, Critical, "This operation is not allowed. Please contact support.", false, false)),
    ("ERROR_WEAK_PASSWORD", Classification::new(Validation, Medium, "Password is too weak. Please choose a stronger password.", false, false)),
    ("ERROR_EMAIL_ALREADY_IN_USE", Classification::new(Authentication, Medium, "An account with this email already exists", false, false)),
    ("PERMISSION_DENIED", Classification::new(Permission, High, "Access denied. Please check your permissions.", false, true)),
    ("NOT_FOUND", Classification::new(Database, Medium, "The requested data was not found", false, false)),
    ("ALREADY_EXISTS", Classification::new(Database, Medium, "This data already exists", false, false)),
    ("RESOURCE_EXHAUSTED", Classification::new(Database, High, "Service temporarily unavailable. Please try again later.", true, false)),
    ("FAILED_PRECONDITION", Classification::new(Database, Medium, "Operation failed due to invalid state", false, false)),
    ("ABORTED", Classification::new(Database, High, "Operation was interrupted. Please try again.", true, false)),
    ("UNAVAILABLE", Classification::new(Network, High, "Service temporarily unavailable. Please check your connection.", true, false)),
    ("DEADLINE_EXCEEDED", Classification::new(Network, High, "Operation timed out. Please try again.", true, false)),
];

const AUTH_FALLBACK: Classification =
    Classification::new(Authentication, High, "Authentication failed. Please try again.", true, false);
const DATABASE_FALLBACK: Classification =
    Classification::new(Database, High, "Database operation failed. Please try again.", true, false);
const TIMEOUT: Classification = Classification::new(
    Network,
    High,
    "Request timed out. Please check your connection and try again.",
    true,
    false,
);
const NETWORK: Classification =
    Classification::new(Network, High, "Network error occurred. Please try again.", true, false);
const PERMISSION: Classification =
    Classification::new(Permission, High, "Permission denied. Please check your access rights.", false, false);
const FILE: Classification =
    Classification::new(File, Medium, "File operation failed. Please try again.", true, false);
const UNKNOWN: Classification =
    Classification::new(Unknown, High, "An unexpected error occurred. Please try again.", true, false);

/// Looks up a backend error code. Unlisted `ERROR_*` codes come from the
/// identity provider and get its fallback; other codes the store's.
pub fn classify_code(code: &str) -> Classification {
    TABLE
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, class)| *class)
        .unwrap_or(if code.starts_with("ERROR_") { AUTH_FALLBACK } else { DATABASE_FALLBACK })
}

/// Classifies an error that carries no code, from its message.
pub fn classify_message(message: &str) -> Classification {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
    if has(&["timeout", "timed out"]) {
        TIMEOUT
    } else if has(&["network", "connection", "unknownhost", "connect", "ioexception"]) {
        NETWORK
    } else if has(&["permission", "denied"]) {
        PERMISSION
    } else if has(&["file", "storage"]) {
        FILE
    } else {
        UNKNOWN
    }
}

pub fn classify(code: Option<&str>, message: &str) -> Classification {
    match code {
        Some(code) => classify_code(code),
        None => classify_message(message),
    }
}

/// Store code for a database failure, when one applies.
pub fn sqlx_code(err: &sqlx::Error) -> Option<&'static str> {
    match err {
        sqlx::Error::RowNotFound => Some("NOT_FOUND"),
        sqlx::Error::PoolTimedOut => Some("DEADLINE_EXCEEDED"),
        sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => Some("UNAVAILABLE"),
        sqlx::Error::Database(db) if db.is_unique_violation() => Some("ALREADY_EXISTS"),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_check_violation() => {
            Some("FAILED_PRECONDITION")
        }
        _ => None,
    }
}

/// Classifies an application error, looking through to a database cause.
pub fn classify_error(err: &anyhow::Error) -> Classification {
    let code = err.chain().find_map(|cause| cause.downcast_ref::<sqlx::Error>().and_then(sqlx_code));
    classify(code, &format!("{err:#}"))
}

/// Logs a classified error at the level its severity calls for.
pub fn report(class: &Classification, operation: &str, technical: &str) {
    let Classification { category, severity, .. } = class;
    match severity {
        Low => debug!(operation, ?category, ?severity, "{technical}"),
        Medium => warn!(operation, ?category, ?severity, "{technical}"),
        High | Critical => error!(operation, ?category, ?severity, "{technical}"),
    }
}
