//! Message database operations
//!
//! Metadata write-backs go through [`merge_message_metadata`], a transactional
//! read-modify-write that only touches one key.

use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use studio_common::{Error, Result};
use uuid::Uuid;

use super::{decode_metadata, encode_metadata, parse_timestamp, parse_uuid};
use crate::models::{ItemMetadata, Message};
use crate::services::metadata_merge;
use crate::utils::retry_on_lock;

const MESSAGE_COLUMNS: &str = "id, session_id, role, text, timestamp, relative_offset, \
                               audio_url, metadata, created_at";

/// Insert a message row
pub async fn insert_message(pool: &SqlitePool, message: &Message) -> Result<()> {
    let metadata = encode_metadata(message.metadata.as_ref())?;

    sqlx::query(
        r#"
        INSERT INTO messages (
            id, session_id, role, text, timestamp, relative_offset,
            audio_url, metadata, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(message.id.to_string())
    .bind(message.session_id.to_string())
    .bind(&message.role)
    .bind(&message.text)
    .bind(message.timestamp)
    .bind(message.relative_offset)
    .bind(&message.audio_url)
    .bind(metadata)
    .bind(message.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

fn message_from_row(row: &SqliteRow) -> Result<Message> {
    let id: String = row.get("id");
    let session_id: String = row.get("session_id");
    let created_at: String = row.get("created_at");

    Ok(Message {
        id: parse_uuid(&id, "id")?,
        session_id: parse_uuid(&session_id, "session_id")?,
        role: row.get("role"),
        text: row.get("text"),
        timestamp: row.get("timestamp"),
        relative_offset: row.get("relative_offset"),
        audio_url: row.get("audio_url"),
        metadata: decode_metadata(row.get("metadata")),
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

/// Messages of a session in chronological order
///
/// Ties on `timestamp` keep insertion order.
pub async fn load_messages_ordered(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<Message>> {
    let sql = format!(
        "SELECT {} FROM messages WHERE session_id = ? ORDER BY timestamp ASC, rowid ASC",
        MESSAGE_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(session_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(message_from_row).collect()
}

pub async fn load_message(pool: &SqlitePool, message_id: Uuid) -> Result<Option<Message>> {
    let sql = format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS);

    let row = sqlx::query(&sql)
        .bind(message_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(message_from_row).transpose()
}

/// Merge one key into a message's metadata
///
/// Reads the current map, merges, and writes it back inside one transaction so
/// keys written concurrently by other subsystems are preserved. Retries on lock
/// contention. Returns the merged map.
pub async fn merge_message_metadata(
    pool: &SqlitePool,
    message_id: Uuid,
    key: &str,
    value: Value,
) -> Result<ItemMetadata> {
    let max_wait_ms = super::settings::get_max_lock_wait_ms(pool).await?;
    let id = message_id.to_string();

    retry_on_lock("merge_message_metadata", max_wait_ms, || {
        let id = id.clone();
        let value = value.clone();
        async move {
            let mut tx = pool.begin().await?;

            let row: Option<(Option<String>,)> =
                sqlx::query_as("SELECT metadata FROM messages WHERE id = ?")
                    .bind(&id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let Some((raw,)) = row else {
                return Err(Error::NotFound(format!("Message {} not found", id)));
            };

            let existing = decode_metadata(raw);
            let merged = metadata_merge::merge(existing.as_ref(), key, value);

            sqlx::query("UPDATE messages SET metadata = ? WHERE id = ?")
                .bind(encode_metadata(Some(&merged))?)
                .bind(&id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(merged)
        }
    })
    .await
}
