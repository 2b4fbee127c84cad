//! Session ownership check

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::error::GenerationError;
use crate::models::Session;

/// Load a session the requester owns
///
/// `NotFound` when the session does not exist, `Unauthorized` when another
/// user owns it. Performs no writes.
pub async fn authorize_session(
    pool: &SqlitePool,
    requester: Uuid,
    session_id: Uuid,
) -> Result<Session, GenerationError> {
    let session = db::sessions::load_session(pool, session_id)
        .await?
        .ok_or_else(|| GenerationError::NotFound(format!("Session {} not found", session_id)))?;

    if !session.is_owned_by(requester) {
        tracing::warn!(
            session_id = %session_id,
            requester = %requester,
            "Rejected access to session owned by another user"
        );
        return Err(GenerationError::Unauthorized(
            "Unauthorized access to session".to_string(),
        ));
    }

    Ok(session)
}
