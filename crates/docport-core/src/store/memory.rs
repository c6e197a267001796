//! In-memory [`DocumentStore`] for tests and embedding.
//!
//! Documents live in a `HashMap` behind one `std::sync::RwLock`. Each
//! mutation runs entirely under the write guard, so updates and deletes on
//! the same id are serialized and a snapshot is never visible without its
//! field overwrite.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{DocError, DocResult};
use crate::models::{now_millis, Document, NewDocument, UpdateDocument};
use crate::query::{paginate, ListQuery, Page};
use crate::version::{apply_update, new_document};

use super::DocumentStore;

pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> DocError {
    DocError::Store(anyhow::anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create(&self, input: NewDocument) -> DocResult<Document> {
        input.validate()?;
        let doc = new_document(uuid::Uuid::new_v4().to_string(), input, now_millis());
        let mut docs = self.docs.write().map_err(poisoned)?;
        docs.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn get(&self, id: &str) -> DocResult<Document> {
        let docs = self.docs.read().map_err(poisoned)?;
        docs.get(id).cloned().ok_or_else(|| DocError::not_found(id))
    }

    async fn update(&self, id: &str, update: UpdateDocument) -> DocResult<Document> {
        update.validate()?;
        let mut docs = self.docs.write().map_err(poisoned)?;
        let current = docs.get(id).ok_or_else(|| DocError::not_found(id))?;
        let next = apply_update(current, &update, now_millis());
        docs.insert(id.to_string(), next.clone());
        Ok(next)
    }

    async fn delete(&self, id: &str) -> DocResult<()> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        docs.remove(id)
            .map(|_| ())
            .ok_or_else(|| DocError::not_found(id))
    }

    async fn list(&self, query: &ListQuery) -> DocResult<Page<Document>> {
        let docs = self.docs.read().map_err(poisoned)?;
        let mut matching: Vec<Document> = docs
            .values()
            .filter(|d| query.filter.matches(d))
            .cloned()
            .collect();
        drop(docs);
        matching.sort_by(|a, b| query.sort.compare(query.order, a, b));
        Ok(paginate(matching, query.page))
    }

    async fn count_by_owner(&self, owner: &str) -> DocResult<u64> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.values().filter(|d| d.owner_username == owner).count() as u64)
    }

    async fn count_all(&self) -> DocResult<u64> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.len() as u64)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> DocResult<u64> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.values().filter(|d| d.created_at >= since).count() as u64)
    }
}
