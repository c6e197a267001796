//! Version history discipline.
//!
//! History is not a separate store: it is the rule every store follows when
//! it updates a document.
//!
//! 1. Capture the live mutable fields as a [`VersionSnapshot`].
//! 2. Append the snapshot to `history`.
//! 3. Overwrite the live fields. The payload reference is replaced only when
//!    a new one was supplied.
//! 4. Advance `updated_at`, strictly past its previous value.
//!
//! [`apply_update`] performs all four steps on a copy, so a store can
//! persist the result in one atomic write or drop it entirely.

use chrono::{DateTime, Duration, Utc};

use crate::models::{now_millis, Document, NewDocument, UpdateDocument, VersionSnapshot};

/// Builds a fresh document with empty history.
pub fn new_document(id: String, input: NewDocument, now: DateTime<Utc>) -> Document {
    Document {
        id,
        owner_username: input.owner_username,
        title: input.fields.title,
        application: input.fields.application,
        description: input.fields.description,
        content_ref: input.content_ref,
        effective_date: input.fields.effective_date,
        created_at: now,
        updated_at: now,
        history: Vec::new(),
    }
}

/// Captures the document's current mutable fields, superseded now.
pub fn snapshot(doc: &Document) -> VersionSnapshot {
    snapshot_at(doc, now_millis())
}

/// Captures the document's current mutable fields, superseded at `at`.
pub fn snapshot_at(doc: &Document, at: DateTime<Utc>) -> VersionSnapshot {
    VersionSnapshot {
        version: doc.history.len() as u32 + 1,
        content_ref: doc.content_ref.clone(),
        title: doc.title.clone(),
        application: doc.application.clone(),
        description: doc.description.clone(),
        effective_date: doc.effective_date,
        superseded_at: at,
    }
}

/// The timestamp an update performed at `now` must record.
///
/// Two updates inside the same millisecond, or a clock step backwards,
/// still yield a strictly increasing `updated_at`.
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::milliseconds(1);
    if now < floor {
        floor
    } else {
        now
    }
}

/// Returns the document as it must look after `update` is applied at `now`.
///
/// No-op updates (identical fields, no payload) still append a snapshot and
/// bump `updated_at`.
pub fn apply_update(current: &Document, update: &UpdateDocument, now: DateTime<Utc>) -> Document {
    let updated_at = next_updated_at(current.updated_at, now);
    let mut next = current.clone();
    next.history.push(snapshot_at(current, updated_at));

    next.title = update.fields.title.clone();
    next.application = update.fields.application.clone();
    next.description = update.fields.description.clone();
    next.effective_date = update.fields.effective_date;
    if let Some(content_ref) = &update.content_ref {
        next.content_ref = content_ref.clone();
    }
    next.updated_at = updated_at;
    next
}
