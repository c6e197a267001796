//! Storage abstraction for docport.
//!
//! The [`DocumentStore`] trait is the document record store: it owns every
//! document and its version history. Implementations must
//!
//! - assign ids that are never reissued, even after deletion;
//! - make every mutation durable before returning;
//! - apply updates through [`crate::version::apply_update`] so the snapshot
//!   append and the field overwrite land together or not at all;
//! - answer counts from current state, without caching.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DocResult;
use crate::models::{Document, NewDocument, UpdateDocument};
use crate::query::{ListQuery, Page};

/// Abstract document record store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create`](DocumentStore::create) | Insert a new document with empty history |
/// | [`get`](DocumentStore::get) | Fetch one document with its history |
/// | [`update`](DocumentStore::update) | Snapshot, then overwrite live fields |
/// | [`delete`](DocumentStore::delete) | Remove a document and its history |
/// | [`list`](DocumentStore::list) | Filtered, ordered, paginated listing |
/// | [`count_by_owner`](DocumentStore::count_by_owner) | Documents owned by a user |
/// | [`count_all`](DocumentStore::count_all) | All documents |
/// | [`count_created_since`](DocumentStore::count_created_since) | Documents created at or after a time |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, input: NewDocument) -> DocResult<Document>;

    /// Fails with [`DocError::NotFound`](crate::DocError::NotFound) for unknown ids.
    async fn get(&self, id: &str) -> DocResult<Document>;

    /// Fails with `NotFound` for unknown ids, leaving the store untouched.
    async fn update(&self, id: &str, update: UpdateDocument) -> DocResult<Document>;

    /// Fails with `NotFound` for unknown ids, leaving the store untouched.
    async fn delete(&self, id: &str) -> DocResult<()>;

    async fn list(&self, query: &ListQuery) -> DocResult<Page<Document>>;

    async fn count_by_owner(&self, owner: &str) -> DocResult<u64>;

    async fn count_all(&self) -> DocResult<u64>;

    async fn count_created_since(&self, since: DateTime<Utc>) -> DocResult<u64>;
}
