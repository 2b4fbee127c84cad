//! Session database operations
//!
//! Session rows are written by the recording backend. This service reads them
//! and updates only the summary columns.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use studio_common::Result;
use uuid::Uuid;

use super::{decode_metadata, encode_metadata, parse_timestamp, parse_uuid};
use crate::models::Session;

/// Insert a session row
pub async fn insert_session(pool: &SqlitePool, session: &Session) -> Result<()> {
    let metadata = encode_metadata(session.metadata.as_ref())?;

    sqlx::query(
        r#"
        INSERT INTO sessions (
            id, user_id, vibe, mode, duration_minutes, summary,
            summary_generated_at, metadata, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.id.to_string())
    .bind(session.user_id.to_string())
    .bind(&session.vibe)
    .bind(&session.mode)
    .bind(session.duration_minutes)
    .bind(&session.summary)
    .bind(session.summary_generated_at.map(|dt| dt.to_rfc3339()))
    .bind(metadata)
    .bind(&session.status)
    .bind(session.created_at.to_rfc3339())
    .bind(session.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a session by id
pub async fn load_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, vibe, mode, duration_minutes, summary,
               summary_generated_at, metadata, status, created_at, updated_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let summary_generated_at: Option<String> = row.get("summary_generated_at");
    let summary_generated_at = summary_generated_at
        .map(|s| parse_timestamp(&s, "summary_generated_at"))
        .transpose()?;

    let user_id: String = row.get("user_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Some(Session {
        id: session_id,
        user_id: parse_uuid(&user_id, "user_id")?,
        vibe: row.get("vibe"),
        mode: row.get("mode"),
        duration_minutes: row.get("duration_minutes"),
        summary: row.get("summary"),
        summary_generated_at,
        metadata: decode_metadata(row.get("metadata")),
        status: row.get("status"),
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    }))
}

/// Store a generated summary and its timestamp in one UPDATE
///
/// Returns `NotFound` if the session row no longer exists.
pub async fn save_summary(
    pool: &SqlitePool,
    session_id: Uuid,
    summary: &str,
    generated_at: DateTime<Utc>,
) -> Result<()> {
    let generated_at = generated_at.to_rfc3339();

    let result = sqlx::query(
        "UPDATE sessions SET summary = ?, summary_generated_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(summary)
    .bind(&generated_at)
    .bind(&generated_at)
    .bind(session_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(studio_common::Error::NotFound(format!(
            "Session {} not found",
            session_id
        )));
    }

    Ok(())
}
