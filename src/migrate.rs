use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Opens the database and creates every table. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Live fields of each document. Timestamps are unix milliseconds,
    // effective_date is an ISO `YYYY-MM-DD` string so it sorts as text.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            owner_username TEXT NOT NULL,
            title TEXT NOT NULL,
            application TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            content_ref TEXT NOT NULL,
            effective_date TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Superseded states, one row per update, append-only.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_versions (
            document_id TEXT NOT NULL,
            version INTEGER NOT NULL,
            content_ref TEXT NOT NULL,
            title TEXT NOT NULL,
            application TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            effective_date TEXT NOT NULL,
            superseded_at INTEGER NOT NULL,
            PRIMARY KEY (document_id, version),
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Account records are written by the account service; only counted here.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            username TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_owner_created ON documents(owner_username, created_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_effective ON documents(effective_date DESC, created_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
