//! Account counters for the admin dashboard.
//!
//! Accounts are created and authenticated by the account service; this
//! module only reads the `users` table.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use docport_core::error::{DocError, DocResult};
use docport_core::models::now_millis;

pub async fn count_users(pool: &SqlitePool) -> DocResult<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(DocError::store)?;
    Ok(count.max(0) as u64)
}

/// Accounts created at or after `since`.
pub async fn count_users_since(pool: &SqlitePool, since: DateTime<Utc>) -> DocResult<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= ?")
        .bind(since.timestamp_millis())
        .fetch_one(pool)
        .await
        .map_err(DocError::store)?;
    Ok(count.max(0) as u64)
}

/// Start of the "new in the last `days` days" window, relative to now.
pub fn window_start(days: u32) -> DateTime<Utc> {
    now_millis() - Duration::days(i64::from(days))
}
