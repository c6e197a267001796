//! SQLite-backed [`DocumentStore`].
//!
//! Live fields sit in `documents`, superseded states in `document_versions`
//! (one row per update, keyed by `(document_id, version)`).
//!
//! Mutations take the document id's lock from [`IdLocks`] and run inside
//! a single SQL transaction, so a snapshot row is committed together with
//! the field overwrite or not at all, and an update can never race a
//! delete of the same id. Reads of a document and its history share one
//! transaction so they always agree.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use docport_core::error::{DocError, DocResult};
use docport_core::models::{now_millis, Document, NewDocument, UpdateDocument, VersionSnapshot};
use docport_core::query::{total_pages, ListQuery, Page, SortKey, SortOrder};
use docport_core::store::DocumentStore;
use docport_core::version::{apply_update, new_document};

use crate::config::Config;
use crate::locks::IdLocks;
use crate::{db, migrate};

const DOCUMENT_COLUMNS: &str = "id, owner_username, title, application, description, \
     content_ref, effective_date, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    pool: SqlitePool,
    locks: IdLocks,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: IdLocks::new(),
        }
    }

    /// Connects to the configured database and ensures the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn store_err(err: sqlx::Error) -> DocError {
    DocError::store(err)
}

fn from_millis(ms: i64) -> DocResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DocError::Store(anyhow!("timestamp out of range: {}", ms)))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(raw: &str) -> DocResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| DocError::Store(anyhow!("corrupt effective_date '{}': {}", raw, e)))
}

fn order_clause(sort: SortKey, order: SortOrder) -> &'static str {
    match (sort, order) {
        (SortKey::EffectiveDate, SortOrder::Descending) => {
            "effective_date DESC, created_at DESC, id DESC"
        }
        (SortKey::EffectiveDate, SortOrder::Ascending) => {
            "effective_date ASC, created_at ASC, id ASC"
        }
        (SortKey::CreatedAt, SortOrder::Descending) => "created_at DESC, id DESC",
        (SortKey::CreatedAt, SortOrder::Ascending) => "created_at ASC, id ASC",
    }
}

fn document_from_row(row: &SqliteRow) -> DocResult<Document> {
    let effective: String = row.get("effective_date");
    Ok(Document {
        id: row.get("id"),
        owner_username: row.get("owner_username"),
        title: row.get("title"),
        application: row.get("application"),
        description: row.get("description"),
        content_ref: row.get("content_ref"),
        effective_date: parse_date(&effective)?,
        created_at: from_millis(row.get("created_at"))?,
        updated_at: from_millis(row.get("updated_at"))?,
        history: Vec::new(),
    })
}

async fn fetch_history(conn: &mut SqliteConnection, id: &str) -> DocResult<Vec<VersionSnapshot>> {
    let rows = sqlx::query(
        "SELECT version, content_ref, title, application, description, effective_date, superseded_at \
         FROM document_versions WHERE document_id = ? ORDER BY version ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(store_err)?;

    rows.iter()
        .map(|row| {
            let version: i64 = row.get("version");
            let effective: String = row.get("effective_date");
            Ok(VersionSnapshot {
                version: u32::try_from(version)
                    .map_err(|_| DocError::Store(anyhow!("corrupt version number {}", version)))?,
                content_ref: row.get("content_ref"),
                title: row.get("title"),
                application: row.get("application"),
                description: row.get("description"),
                effective_date: parse_date(&effective)?,
                superseded_at: from_millis(row.get("superseded_at"))?,
            })
        })
        .collect()
}

async fn fetch_document(conn: &mut SqliteConnection, id: &str) -> DocResult<Option<Document>> {
    let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(store_err)?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut doc = document_from_row(&row)?;
    doc.history = fetch_history(conn, id).await?;
    Ok(Some(doc))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create(&self, input: NewDocument) -> DocResult<Document> {
        input.validate()?;
        let doc = new_document(uuid::Uuid::new_v4().to_string(), input, now_millis());

        sqlx::query(
            r#"
            INSERT INTO documents (id, owner_username, title, application, description,
                                   content_ref, effective_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.owner_username)
        .bind(&doc.title)
        .bind(&doc.application)
        .bind(&doc.description)
        .bind(&doc.content_ref)
        .bind(format_date(doc.effective_date))
        .bind(doc.created_at.timestamp_millis())
        .bind(doc.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        debug!(id = %doc.id, owner = %doc.owner_username, "document created");
        Ok(doc)
    }

    async fn get(&self, id: &str) -> DocResult<Document> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let doc = fetch_document(&mut tx, id).await?;
        tx.commit().await.map_err(store_err)?;
        doc.ok_or_else(|| DocError::not_found(id))
    }

    async fn update(&self, id: &str, update: UpdateDocument) -> DocResult<Document> {
        update.validate()?;
        let _guard = self.locks.acquire(id).await;
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        // Write before reading: a deferred transaction that reads first
        // cannot later upgrade to a writer once another commit lands.
        let claimed = sqlx::query("UPDATE documents SET updated_at = updated_at WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        if claimed.rows_affected() == 0 {
            return Err(DocError::not_found(id));
        }

        let current = fetch_document(&mut tx, id)
            .await?
            .ok_or_else(|| DocError::not_found(id))?;
        let next = apply_update(&current, &update, now_millis());
        let snap = next
            .history
            .last()
            .ok_or_else(|| DocError::Store(anyhow!("update produced no snapshot")))?;

        sqlx::query(
            r#"
            INSERT INTO document_versions (document_id, version, content_ref, title,
                                           application, description, effective_date,
                                           superseded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(snap.version as i64)
        .bind(&snap.content_ref)
        .bind(&snap.title)
        .bind(&snap.application)
        .bind(&snap.description)
        .bind(format_date(snap.effective_date))
        .bind(snap.superseded_at.timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        sqlx::query(
            r#"
            UPDATE documents SET
                title = ?, application = ?, description = ?, content_ref = ?,
                effective_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&next.title)
        .bind(&next.application)
        .bind(&next.description)
        .bind(&next.content_ref)
        .bind(format_date(next.effective_date))
        .bind(next.updated_at.timestamp_millis())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        debug!(id, version = snap.version, "document updated");
        Ok(next)
    }

    async fn delete(&self, id: &str) -> DocResult<()> {
        let _guard = self.locks.acquire(id).await;
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query("DELETE FROM document_versions WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back.
            return Err(DocError::not_found(id));
        }

        tx.commit().await.map_err(store_err)?;
        debug!(id, "document deleted");
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> DocResult<Page<Document>> {
        let (where_clause, owner) = match &query.filter.owner {
            Some(owner) => ("WHERE owner_username = ?", Some(owner.as_str())),
            None => ("", None),
        };
        let limit = i64::from(query.page.page_size());
        let offset = i64::try_from(query.page.offset()).unwrap_or(i64::MAX);

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let count_sql = format!("SELECT COUNT(*) FROM documents {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(owner) = owner {
            count_query = count_query.bind(owner);
        }
        let total: i64 = count_query.fetch_one(&mut *tx).await.map_err(store_err)?;

        let list_sql = format!(
            "SELECT {} FROM documents {} ORDER BY {} LIMIT ? OFFSET ?",
            DOCUMENT_COLUMNS,
            where_clause,
            order_clause(query.sort, query.order)
        );
        let mut list_query = sqlx::query(&list_sql);
        if let Some(owner) = owner {
            list_query = list_query.bind(owner);
        }
        let rows = list_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await
            .map_err(store_err)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut doc = document_from_row(row)?;
            doc.history = fetch_history(&mut tx, &doc.id).await?;
            items.push(doc);
        }
        tx.commit().await.map_err(store_err)?;

        let total_items = total.max(0) as u64;
        Ok(Page {
            items,
            page: query.page.page(),
            total_pages: total_pages(total_items, query.page.page_size()),
            total_items,
        })
    }

    async fn count_by_owner(&self, owner: &str) -> DocResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE owner_username = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(count.max(0) as u64)
    }

    async fn count_all(&self) -> DocResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(count.max(0) as u64)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> DocResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE created_at >= ?")
            .bind(since.timestamp_millis())
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(count.max(0) as u64)
    }
}
