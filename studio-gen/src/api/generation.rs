//! Generation endpoints
//!
//! Requester identity arrives in the `x-user-id` header, set by the
//! authentication layer in front of this service.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, GenerationError};
use crate::services::{authorize_session, AnimationRequest};
use crate::AppState;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated requester
#[derive(Debug, Clone, Copy)]
pub struct RequesterId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for RequesterId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {} header", USER_ID_HEADER)))?;

        value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(RequesterId)
            .ok_or_else(|| ApiError::Unauthenticated(format!("invalid {} header", USER_ID_HEADER)))
    }
}

/// Summary response
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub session_id: Uuid,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

/// Avatar animation request body
#[derive(Debug, Deserialize)]
pub struct AvatarAnimationBody {
    pub avatar_image_url: String,
    #[serde(default)]
    pub skip_already_animated: bool,
}

/// Avatar animation acknowledgement
#[derive(Debug, Serialize)]
pub struct AvatarAnimationAccepted {
    pub status: String,
    pub session_id: Uuid,
}

/// Keep `err` for `/health` diagnostics
///
/// Batch-fatal errors reject the request itself (missing credential, unknown
/// session, wrong owner) and are not recorded.
async fn record_error(state: &AppState, err: &GenerationError) {
    if !err.is_batch_fatal() {
        *state.last_error.write().await = Some(err.to_string());
    }
}

/// POST /sessions/:id/summary
///
/// Generates and stores a summary, returning it once persisted.
pub async fn generate_summary(
    State(state): State<AppState>,
    RequesterId(requester): RequesterId,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SummaryResponse>> {
    authorize_session(&state.db, requester, session_id).await?;

    match state.summary.generate(session_id).await {
        Ok(generated) => Ok(Json(SummaryResponse {
            session_id,
            summary: generated.summary,
            generated_at: generated.generated_at,
        })),
        Err(e) => {
            record_error(&state, &e).await;
            Err(e.into())
        }
    }
}

/// POST /sessions/:id/avatars
///
/// Batch-fatal preconditions are checked before responding; the batch itself
/// runs on a tracked background task and reports through `/events`.
pub async fn generate_avatars(
    State(state): State<AppState>,
    RequesterId(requester): RequesterId,
    Path(session_id): Path<Uuid>,
    Json(body): Json<AvatarAnimationBody>,
) -> ApiResult<(StatusCode, Json<AvatarAnimationAccepted>)> {
    authorize_session(&state.db, requester, session_id).await?;
    state.orchestrator.check_ready(&body.avatar_image_url)?;

    let request = AnimationRequest {
        session_id,
        avatar_image_url: body.avatar_image_url,
        skip_already_animated: body.skip_already_animated,
    };

    let orchestrator = state.orchestrator.clone();
    let task_state = state.clone();
    state.tasks.spawn(async move {
        match orchestrator.generate_animated_avatars(&request).await {
            Ok(outcome) => {
                tracing::debug!(
                    session_id = %outcome.session_id,
                    attempted = outcome.attempted,
                    "Background animation batch finished"
                );
            }
            Err(e) => {
                tracing::error!(session_id = %request.session_id, error = %e, "Background animation batch failed");
                record_error(&task_state, &e).await;
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AvatarAnimationAccepted {
            status: "processing".to_string(),
            session_id,
        }),
    ))
}

/// Build generation routes
pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/:id/summary", post(generate_summary))
        .route("/sessions/:id/avatars", post(generate_avatars))
}
