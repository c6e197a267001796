//! Document retrieval by ID.
//!
//! Reads a document and its version history straight from the database.
//! Used by the `docport get` CLI command.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};

use docport_core::models::Document;
use docport_core::store::DocumentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn get_document(config: &Config, id: &str) -> Result<Document> {
    let store = SqliteStore::open(config).await?;
    let result = store.get(id).await;
    store.pool().close().await;
    Ok(result?)
}

/// CLI entry point: prints the live fields, then each superseded version.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let doc = get_document(config, id).await?;

    println!("--- Document ---");
    println!("id:             {}", doc.id);
    println!("owner:          {}", doc.owner_username);
    println!("title:          {}", doc.title);
    if !doc.application.is_empty() {
        println!("application:    {}", doc.application);
    }
    if !doc.description.is_empty() {
        println!("description:    {}", doc.description);
    }
    println!("effective_date: {}", doc.effective_date);
    println!("content_ref:    {}", doc.content_ref);
    println!("created_at:     {}", format_ts(doc.created_at));
    println!("updated_at:     {}", format_ts(doc.updated_at));
    println!();

    println!("--- History ({}) ---", doc.history.len());
    for snap in doc.history.iter().rev() {
        println!(
            "[v{}] {}  {}  (superseded {})",
            snap.version,
            snap.effective_date,
            snap.title,
            format_ts(snap.superseded_at)
        );
        println!("      {}", snap.content_ref);
    }

    Ok(())
}

pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
