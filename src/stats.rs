//! Dashboard counters read directly from the database.
//!
//! The same numbers the admin dashboard fetches over HTTP, plus a per-owner
//! breakdown. Used by `docport stats`.

use anyhow::Result;
use sqlx::Row;

use docport_core::store::DocumentStore;

use crate::accounts;
use crate::config::Config;
use crate::sqlite_store::SqliteStore;

struct OwnerStats {
    owner: String,
    doc_count: i64,
    version_count: i64,
    last_update_ms: i64,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let pool = store.pool().clone();

    let total_docs = store.count_all().await?;
    let total_users = accounts::count_users(&pool).await?;
    let window = config.metrics.new_users_window_days;
    let since = accounts::window_start(window);
    let new_users = accounts::count_users_since(&pool, since).await?;
    let new_docs = store.count_created_since(since).await?;
    let total_versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_versions")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docport database stats");
    println!("======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", total_docs);
    println!("  New docs:    {} (last {} days)", new_docs, window);
    println!("  Versions:    {}", total_versions);
    println!("  Users:       {}", total_users);
    println!("  New users:   {} (last {} days)", new_users, window);

    let rows = sqlx::query(
        r#"
        SELECT
            d.owner_username AS owner,
            COUNT(DISTINCT d.id) AS doc_count,
            COUNT(v.version) AS version_count,
            MAX(d.updated_at) AS last_update
        FROM documents d
        LEFT JOIN document_versions v ON v.document_id = d.id
        GROUP BY d.owner_username
        ORDER BY doc_count DESC, owner ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let owners: Vec<OwnerStats> = rows
        .iter()
        .map(|row| OwnerStats {
            owner: row.get("owner"),
            doc_count: row.get("doc_count"),
            version_count: row.get("version_count"),
            last_update_ms: row.get("last_update"),
        })
        .collect();

    if !owners.is_empty() {
        println!();
        println!("  By owner:");
        println!(
            "  {:<24} {:>6} {:>9}   {}",
            "OWNER", "DOCS", "VERSIONS", "LAST UPDATE"
        );
        println!("  {}", "-".repeat(60));
        for o in &owners {
            println!(
                "  {:<24} {:>6} {:>9}   {}",
                o.owner,
                o.doc_count,
                o.version_count,
                format_ts_relative(o.last_update_ms)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Relative time for a unix-millis timestamp (e.g. "3 hours ago").
fn format_ts_relative(ts_ms: i64) -> String {
    let delta = (chrono::Utc::now().timestamp_millis() - ts_ms) / 1000;

    if delta < 0 {
        return format_ts_iso(ts_ms);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts_ms)
    }
}

fn format_ts_iso(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}
