//! Settings database operations
//!
//! Key/value accessors over the `settings` table.

use sqlx::{Pool, Sqlite};
use studio_common::{Error, Result};

/// Lock wait budget for write-backs when the setting is absent
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Get a setting value
///
/// **Returns:** Some(value) if exists, None if not set
pub async fn get_setting(db: &Pool<Sqlite>, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    Ok(row.map(|(value,)| value))
}

/// Insert or replace a setting value
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Get a setting parsed into `T`
async fn get_parsed<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_setting(db, key).await? {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e))),
        None => Ok(None),
    }
}

/// Maximum time a write-back keeps retrying on `database is locked`
///
/// **Default:** 5000 ms
pub async fn get_max_lock_wait_ms(db: &Pool<Sqlite>) -> Result<u64> {
    get_parsed(db, "database_max_lock_wait_ms")
        .await
        .map(|opt| opt.unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS))
}
