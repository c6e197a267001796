//! Core data models.
//!
//! A [`Document`] is one uploaded artifact: owner, free-text metadata, the
//! business date, a reference to its current payload and the append-only
//! list of [`VersionSnapshot`]s it has superseded.
//!
//! All record timestamps are kept at millisecond precision so a value that
//! round-trips through a store or JSON compares equal to the original.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DocError, DocResult};

/// A stored document with its full version history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub owner_username: String,
    pub title: String,
    pub application: String,
    pub description: String,
    pub content_ref: String,
    pub effective_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<VersionSnapshot>,
}

/// Immutable copy of a document's mutable fields as they stood right
/// before an update replaced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    /// 1-based position in the owning document's history.
    pub version: u32,
    pub content_ref: String,
    pub title: String,
    pub application: String,
    pub description: String,
    pub effective_date: NaiveDate,
    pub superseded_at: DateTime<Utc>,
}

/// The caller-editable metadata of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields {
    pub title: String,
    pub application: String,
    pub description: String,
    pub effective_date: NaiveDate,
}

/// Input for [`DocumentStore::create`](crate::store::DocumentStore::create).
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_username: String,
    pub fields: DocumentFields,
    pub content_ref: String,
}

/// Input for [`DocumentStore::update`](crate::store::DocumentStore::update).
///
/// `content_ref` is `None` when no new payload was supplied; the current
/// payload is then kept.
#[derive(Debug, Clone)]
pub struct UpdateDocument {
    pub fields: DocumentFields,
    pub content_ref: Option<String>,
}

impl Document {
    pub fn fields(&self) -> DocumentFields {
        DocumentFields {
            title: self.title.clone(),
            application: self.application.clone(),
            description: self.description.clone(),
            effective_date: self.effective_date,
        }
    }
}

impl DocumentFields {
    pub fn validate(&self) -> DocResult<()> {
        if self.title.trim().is_empty() {
            return Err(DocError::validation("title must not be empty"));
        }
        Ok(())
    }
}

impl NewDocument {
    pub fn validate(&self) -> DocResult<()> {
        if self.owner_username.trim().is_empty() {
            return Err(DocError::validation("username must not be empty"));
        }
        if self.content_ref.trim().is_empty() {
            return Err(DocError::validation("a file is required"));
        }
        self.fields.validate()
    }
}

impl UpdateDocument {
    pub fn validate(&self) -> DocResult<()> {
        if let Some(content_ref) = &self.content_ref {
            if content_ref.trim().is_empty() {
                return Err(DocError::validation("content reference must not be empty"));
            }
        }
        self.fields.validate()
    }
}

/// Current time truncated to whole milliseconds.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Parses a user-supplied business date.
///
/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, in which case only
/// the UTC calendar date is kept. Years must lie in `0..=9999` so the stored
/// `YYYY-MM-DD` text orders the same way the dates do.
pub fn parse_effective_date(raw: &str) -> DocResult<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DocError::validation("date must not be empty"));
    }
    let date = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc).date_naive())
            .map_err(|_| DocError::validation(format!("invalid date: {raw}")))?,
    };
    if !(0..=9999).contains(&date.year()) {
        return Err(DocError::validation(format!(
            "date year must be between 0000 and 9999: {raw}"
        )));
    }
    Ok(date)
}
