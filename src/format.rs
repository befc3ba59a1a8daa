//! Display strings for values that already passed the privacy gate.
//!
//! Everything here is pure; callers pass the clock in.

use time::{Duration, OffsetDateTime, macros::format_description};

/// Largest unread count shown before collapsing to `"99+"`.
pub const UNREAD_CEILING: u32 = 99;

/// How many skills a card lists before summarising the rest.
pub const SKILLS_SHOWN: usize = 3;

const ELLIPSIS: &str = "...";

/// Cuts `text` to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let Some(keep) = max_chars.checked_sub(ELLIPSIS.len()) else {
        return text.chars().take(max_chars).collect();
    };
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// `"Rust • Go • SQL +2 more"`; `None` for an empty list.
pub fn skills_summary<S: AsRef<str>>(skills: &[S]) -> Option<String> {
    if skills.is_empty() {
        return None;
    }
    let mut out = skills
        .iter()
        .take(SKILLS_SHOWN)
        .map(|s| s.as_ref())
        .collect::<Vec<&str>>()
        .join(" \u{2022} ");
    if skills.len() > SKILLS_SHOWN {
        out.push_str(&format!(" +{} more", skills.len() - SKILLS_SHOWN));
    }
    Some(out)
}

/// Calendar form used once a timestamp is older than a week, e.g. `Oct 09, 2026`.
pub fn calendar_date(at: OffsetDateTime) -> String {
    let fmt = format_description!("[month repr:short] [day], [year]");
    at.format(&fmt).unwrap_or_else(|_| at.date().to_string())
}

/// `"Just now"`, `"5m ago"`, `"3h ago"`, `"2d ago"`, then a calendar date.
pub fn relative_time(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let diff = now - then;
    if diff < Duration::MINUTE {
        "Just now".to_owned()
    } else if diff < Duration::HOUR {
        format!("{}m ago", diff.whole_minutes())
    } else if diff < Duration::DAY {
        format!("{}h ago", diff.whole_hours())
    } else if diff < Duration::WEEK {
        format!("{}d ago", diff.whole_days())
    } else {
        calendar_date(then)
    }
}

/// Clock span of an event, e.g. `2:30 PM - 4:00 PM`.
pub fn time_range(start: OffsetDateTime, end: OffsetDateTime) -> String {
    let fmt = format_description!("[hour repr:12 padding:none]:[minute] [period]");
    let clock = |at: OffsetDateTime| at.format(&fmt).unwrap_or_else(|_| at.time().to_string());
    format!("{} - {}", clock(start), clock(end))
}

/// How far off an event is: `"In 3 days"`, `"Happening now"`, `"Event ended"`.
pub fn until(start: OffsetDateTime, end: OffsetDateTime, now: OffsetDateTime) -> String {
    if end < now {
        return "Event ended".to_owned();
    }
    if start <= now {
        return "Happening now".to_owned();
    }
    let diff = start - now;
    let days = diff.whole_days().unsigned_abs();
    if diff < Duration::HOUR {
        "Starting soon".to_owned()
    } else if diff < Duration::DAY {
        format!("In {}h", diff.whole_hours())
    } else if days < 7 {
        format!("In {}", pluralize(days, "day", "days"))
    } else if days < 30 {
        format!("In {}", pluralize(days / 7, "week", "weeks"))
    } else {
        format!("In {}", pluralize(days / 30, "month", "months"))
    }
}

/// Time left on a job posting.
pub fn days_left(expires: OffsetDateTime, now: OffsetDateTime) -> String {
    match (expires - now).whole_days() {
        days if days <= 0 => "Expired".to_owned(),
        1 => "1 day left".to_owned(),
        days => format!("{days} days left"),
    }
}

/// Presence line for a profile header.
pub fn last_seen(then: Option<OffsetDateTime>, now: OffsetDateTime) -> String {
    let Some(then) = then else {
        return "Offline".to_owned();
    };
    let diff = now - then;
    if diff < Duration::minutes(5) {
        "Active now".to_owned()
    } else if diff < Duration::HOUR {
        format!("Active {}m ago", diff.whole_minutes())
    } else if diff < Duration::DAY {
        format!("Active {}h ago", diff.whole_hours())
    } else {
        format!("Active {}d ago", diff.whole_days())
    }
}

/// Badge text for an unread counter; `None` hides the badge.
pub fn unread_badge(count: u32) -> Option<String> {
    match count {
        0 => None,
        n if n > UNREAD_CEILING => Some(format!("{UNREAD_CEILING}+")),
        n => Some(n.to_string()),
    }
}

pub fn pluralize(count: u64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Human-readable size of an attachment.
pub fn file_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Share of the ten completion fields an owner has filled in, as a percentage.
pub fn profile_completion(filled: &[bool; 10]) -> u8 {
    let count = filled.iter().filter(|f| **f).count();
    // at most 100, fits
    (count * 100 / filled.len()) as u8
}
