//! Database access for studio-gen
//!
//! Sessions and messages are owned by the recording backend; this service
//! reads them and writes back only its own fields (summary, per-message
//! metadata keys).

pub mod messages;
pub mod sessions;
pub mod settings;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

use crate::models::ItemMetadata;

/// Database file name inside the root folder
pub const DB_FILE_NAME: &str = "studio.db";

/// Initialize database connection pool
///
/// Connects to `studio.db` in the root folder, creating it when absent.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the session, message and settings tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            vibe TEXT NOT NULL DEFAULT '',
            mode TEXT NOT NULL DEFAULT '',
            duration_minutes INTEGER NOT NULL DEFAULT 0,
            summary TEXT,
            summary_generated_at TEXT,
            metadata TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            text TEXT NOT NULL DEFAULT '',
            timestamp INTEGER NOT NULL,
            relative_offset INTEGER NOT NULL DEFAULT 0,
            audio_url TEXT,
            metadata TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_session_time ON messages(session_id, timestamp)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, sessions, messages)");

    Ok(())
}

/// Decode a nullable JSON object column
///
/// NULL, empty text and non-object JSON all read as absent.
pub(crate) fn decode_metadata(raw: Option<String>) -> Option<ItemMetadata> {
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| match serde_json::from_str::<serde_json::Value>(&s) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable metadata column");
                None
            }
        })
}

pub(crate) fn encode_metadata(
    metadata: Option<&ItemMetadata>,
) -> studio_common::Result<Option<String>> {
    metadata
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| studio_common::Error::Internal(format!("Failed to serialize metadata: {}", e)))
}

pub(crate) fn parse_timestamp(
    value: &str,
    column: &str,
) -> studio_common::Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| studio_common::Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> studio_common::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| studio_common::Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_metadata_tolerates_garbage() {
        assert!(decode_metadata(None).is_none());
        assert!(decode_metadata(Some("".into())).is_none());
        assert!(decode_metadata(Some("[1,2]".into())).is_none());
        assert!(decode_metadata(Some("{not json".into())).is_none());

        let map = decode_metadata(Some(r#"{"k":"v"}"#.into())).unwrap();
        assert_eq!(map.get("k").and_then(|v| v.as_str()), Some("v"));
    }
}
