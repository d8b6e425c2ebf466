//! Board UI state — everything the comment board renders.
//!
//! DESIGN
//! ======
//! `BoardState` is a plain data model. The controller owns the only live copy
//! and hands out clones via `CommentBoardController::snapshot`, so renderers
//! never observe a half-applied update.

use serde::Serialize;
use time::macros::{format_description, time};
use time::{Date, OffsetDateTime, PrimitiveDateTime};

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

/// Name of the bucket bootstrapped on activation.
pub const DEFAULT_BUCKET: &str = "comments";

/// Prefix shared by every non-default bucket name.
pub const BUCKET_PREFIX: &str = "comments-";

/// Shown in place of a date the store sent in a shape we cannot read.
pub const INVALID_DATE: &str = "Invalid date";

// =============================================================================
// BUCKETS & COMMENTS
// =============================================================================

/// A named grouping of comments in the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub name: String,
}

impl Bucket {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Full bucket name for a user-supplied suffix, or the default bucket.
#[must_use]
pub fn bucket_name_for(suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{BUCKET_PREFIX}{suffix}"),
        None => DEFAULT_BUCKET.to_owned(),
    }
}

/// A comment as displayed in the list. `date` is already in display form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: Option<String>,
    pub bucket_name: String,
    pub date: String,
    pub body: String,
}

/// Format a store timestamp as `YYYY/MM/DD`.
///
/// Accepts RFC 3339 strings, bare `YYYY-MM-DD` dates and epoch milliseconds.
/// Anything else renders as [`INVALID_DATE`].
#[must_use]
pub fn display_date(raw: &serde_json::Value) -> String {
    let date = match raw {
        serde_json::Value::String(s) => parse_date_str(s),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|ms| OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok())
            .map(OffsetDateTime::date),
        _ => None,
    };

    date.and_then(|d| d.format(format_description!("[year]/[month]/[day]")).ok())
        .unwrap_or_else(|| INVALID_DATE.to_owned())
}

fn parse_date_str(s: &str) -> Option<Date> {
    if let Ok(ts) = OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339) {
        return Some(ts.date());
    }
    Date::parse(s, format_description!("[year]-[month]-[day]")).ok()
}

/// Noon UTC on `date`. Keeps the calendar day stable across time zones.
#[must_use]
pub fn noon_of(date: Date) -> OffsetDateTime {
    PrimitiveDateTime::new(date, time!(12:00)).assume_utc()
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Banner styling level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Danger,
}

/// The single status banner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub text: String,
    pub severity: Severity,
}

impl Message {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Success }
    }

    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Warning }
    }

    #[must_use]
    pub fn danger(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Danger }
    }
}

// =============================================================================
// FORM
// =============================================================================

/// Fields of the new-comment form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentDraft {
    pub date: Date,
    pub body: String,
}

impl Default for CommentDraft {
    fn default() -> Self {
        Self { date: OffsetDateTime::now_utc().date(), body: String::new() }
    }
}

// =============================================================================
// BOARD STATE
// =============================================================================

/// UI state for one controller activation.
#[derive(Clone, Debug, Default)]
pub struct BoardState {
    /// Most recent page of comments.
    pub comments: Vec<Comment>,
    pub buckets: Vec<Bucket>,
    pub selected_bucket: Option<Bucket>,
    /// Name typed into the create-bucket field.
    pub pending_bucket_name: String,
    pub draft: CommentDraft,
    pub loading_comments: bool,
    pub loading_buckets: bool,
    pub submitted: bool,
    pub message: Option<Message>,
}

impl BoardState {
    /// Name of the selected bucket, if any.
    #[must_use]
    pub fn selected_bucket_name(&self) -> Option<&str> {
        self.selected_bucket.as_ref().map(|b| b.name.as_str())
    }
}
