//! Avatar animation batch orchestrator
//!
//! Drives one provider job per eligible host message through
//! submit → poll* → terminal, isolating every item from its neighbours.
//!
//! **Per item:**
//! - submit error → `Failed` (never retried in the same run)
//! - Pending/Running → wait `poll.interval`, poll again
//! - Succeeded with output → merge `animatedVideoUrl` into message metadata at once
//! - Succeeded without output → `Failed { MalformedSuccess }`
//! - Failed/Canceled → `Failed { ProviderReported }`
//! - transient poll error → consumes one attempt, keeps polling
//! - rejected poll (auth, unknown job) → `Failed { Poll }`
//! - attempt ceiling → `TimedOut`
//! - shutdown → `Abandoned` (the provider job keeps running)
//!
//! A batch only returns `Err` for conditions that stop every item before the
//! first submit: missing credential, missing avatar image, unknown session.

use chrono::Utc;
use futures::{stream, FutureExt, StreamExt};
use serde_json::Value;
use sqlx::SqlitePool;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use studio_common::events::{EventBus, StudioEvent};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::job_client::{JobClient, JobClientError};
use super::metadata_merge::ANIMATED_VIDEO_URL_KEY;
use crate::config::{GenerationConfig, PollPolicy};
use crate::db;
use crate::error::GenerationError;
use crate::models::{
    BatchOutcome, FailureKind, GenerationRequest, ItemOutcome, ItemReport, ItemState, JobHandle,
    JobResult, Message, ProviderResponse, SkipReason,
};

/// One batch trigger
#[derive(Debug, Clone)]
pub struct AnimationRequest {
    pub session_id: Uuid,
    /// Avatar image every item is animated from
    pub avatar_image_url: String,
    /// Skip messages that already carry an animated video
    pub skip_already_animated: bool,
}

/// Batch member that passed the eligibility filter
#[derive(Debug, Clone)]
struct EligibleItem {
    item_id: Uuid,
    audio_url: String,
}

/// Eligible items and skip reports for one session
#[derive(Debug, Default)]
struct BatchPlan {
    eligible: Vec<EligibleItem>,
    skipped: Vec<ItemReport>,
}

/// Split a session's host messages into eligible items and skips
///
/// Guest messages are not batch members. When animation is disabled for the
/// session every host message is skipped.
fn plan_batch(
    messages: &[Message],
    animation_enabled: bool,
    skip_already_animated: bool,
) -> BatchPlan {
    let mut plan = BatchPlan::default();

    for message in messages.iter().filter(|m| m.is_host()) {
        let eligible = match message.usable_audio() {
            _ if !animation_enabled => Err(SkipReason::AnimationDisabled),
            None => Err(SkipReason::NoAudio),
            Some(_) if skip_already_animated && message.has_metadata_key(ANIMATED_VIDEO_URL_KEY) => {
                Err(SkipReason::AlreadyAnimated)
            }
            Some(audio_url) => Ok(audio_url),
        };

        match eligible {
            Ok(audio_url) => plan.eligible.push(EligibleItem {
                item_id: message.id,
                audio_url: audio_url.to_string(),
            }),
            Err(reason) => plan.skipped.push(ItemReport::skipped(message.id, reason)),
        }
    }

    plan
}

/// Move an item to its next state
fn advance(state: &mut ItemState, next: ItemState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal item transition {:?} -> {:?}",
        state,
        next
    );
    *state = next;
}

pub struct AnimationOrchestrator {
    db: SqlitePool,
    client: Arc<dyn JobClient>,
    policy: PollPolicy,
    max_concurrent_items: usize,
    event_bus: EventBus,
    shutdown: CancellationToken,
}

impl AnimationOrchestrator {
    pub fn new(
        db: SqlitePool,
        client: Arc<dyn JobClient>,
        config: &GenerationConfig,
        event_bus: EventBus,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            db,
            client,
            policy: config.poll,
            max_concurrent_items: config.max_concurrent_items.max(1),
            event_bus,
            shutdown,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Checks that need no storage access
    ///
    /// Run synchronously by the HTTP layer before spawning a batch.
    pub fn check_ready(&self, avatar_image_url: &str) -> Result<(), GenerationError> {
        if !self.client.is_configured() {
            return Err(GenerationError::Configuration(format!(
                "{} credential not configured",
                self.client.name()
            )));
        }

        if avatar_image_url.trim().is_empty() {
            return Err(GenerationError::Validation(
                "avatar image URL is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Animate every eligible host message of a session
    ///
    /// Item failures are reported in the returned outcome, never as `Err`.
    pub async fn generate_animated_avatars(
        &self,
        request: &AnimationRequest,
    ) -> Result<BatchOutcome, GenerationError> {
        let session_id = request.session_id;

        let plan = match self.load_plan(request).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Animation batch not started");
                self.event_bus.emit_lossy(StudioEvent::AnimationBatchFailed {
                    session_id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
        };

        let mut outcome = BatchOutcome::new(session_id);

        tracing::info!(
            session_id = %session_id,
            eligible = plan.eligible.len(),
            skipped = plan.skipped.len(),
            max_concurrent_items = self.max_concurrent_items,
            "Starting avatar animation batch"
        );
        self.event_bus.emit_lossy(StudioEvent::AnimationBatchStarted {
            session_id,
            eligible: plan.eligible.len(),
            skipped: plan.skipped.len(),
            timestamp: Utc::now(),
        });

        for report in plan.skipped {
            tracing::debug!(
                session_id = %session_id,
                item_id = %report.item_id,
                outcome = report.outcome.label(),
                "Item skipped"
            );
            outcome.record(report);
        }

        let avatar_image_url = request.avatar_image_url.trim();
        let reports: Vec<ItemReport> = stream::iter(plan.eligible)
            .map(|item| self.run_item(session_id, avatar_image_url, item))
            .buffer_unordered(self.max_concurrent_items)
            .collect()
            .await;

        for report in reports {
            outcome.record(report);
        }

        tracing::info!(
            session_id = %session_id,
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            timed_out = outcome.timed_out,
            abandoned = outcome.abandoned,
            skipped = outcome.skipped,
            "Avatar animation batch completed"
        );
        self.event_bus.emit_lossy(StudioEvent::AnimationBatchCompleted {
            session_id,
            attempted: outcome.attempted,
            succeeded: outcome.succeeded,
            failed: outcome.failed,
            timed_out: outcome.timed_out,
            abandoned: outcome.abandoned,
            skipped: outcome.skipped,
            timestamp: Utc::now(),
        });

        Ok(outcome)
    }

    /// Batch-fatal checks, then the eligibility filter
    async fn load_plan(&self, request: &AnimationRequest) -> Result<BatchPlan, GenerationError> {
        self.check_ready(&request.avatar_image_url)?;

        let session = db::sessions::load_session(&self.db, request.session_id)
            .await?
            .ok_or_else(|| {
                GenerationError::NotFound(format!("Session {} not found", request.session_id))
            })?;

        let animation_enabled = session.animation_enabled();
        if !animation_enabled {
            tracing::info!(
                session_id = %session.id,
                "Avatar animation not enabled for session; skipping all items"
            );
        }

        let messages = db::messages::load_messages_ordered(&self.db, session.id).await?;
        Ok(plan_batch(
            &messages,
            animation_enabled,
            request.skip_already_animated,
        ))
    }

    /// Item boundary: a panic inside one item becomes that item's failure
    async fn run_item(
        &self,
        session_id: Uuid,
        avatar_image_url: &str,
        item: EligibleItem,
    ) -> ItemReport {
        let item_id = item.item_id;

        let report = AssertUnwindSafe(self.process_item(session_id, avatar_image_url, item))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| ItemReport {
                item_id,
                provider_job_id: None,
                attempts: 0,
                outcome: ItemOutcome::Failed {
                    kind: FailureKind::Internal,
                    detail: "item processing panicked".to_string(),
                },
            });

        self.log_terminal(session_id, &report);
        report
    }

    fn log_terminal(&self, session_id: Uuid, report: &ItemReport) {
        let outcome = report.outcome.label();
        let provider_job_id = report.provider_job_id.as_deref().unwrap_or("-");
        let status = report.status();

        match &report.outcome {
            ItemOutcome::Succeeded { output_url } => tracing::info!(
                session_id = %session_id,
                item_id = %report.item_id,
                provider_job_id,
                attempts = report.attempts,
                outcome,
                status = ?status,
                output_url = %output_url,
                "Avatar animation item finished"
            ),
            other => tracing::warn!(
                session_id = %session_id,
                item_id = %report.item_id,
                provider_job_id,
                attempts = report.attempts,
                outcome,
                status = ?status,
                detail = %other.detail().unwrap_or_default(),
                "Avatar animation item finished without result"
            ),
        }

        let (output_url, detail) = report
            .job_result()
            .map(|result| (result.output_url, result.error_detail))
            .unwrap_or_default();
        self.event_bus.emit_lossy(StudioEvent::AnimationItemCompleted {
            session_id,
            item_id: report.item_id,
            outcome: outcome.to_string(),
            output_url,
            detail,
            timestamp: Utc::now(),
        });
    }

    async fn process_item(
        &self,
        session_id: Uuid,
        avatar_image_url: &str,
        item: EligibleItem,
    ) -> ItemReport {
        let mut state = ItemState::NotStarted;
        let mut report = ItemReport {
            item_id: item.item_id,
            provider_job_id: None,
            attempts: 0,
            outcome: ItemOutcome::Abandoned,
        };

        if self.shutdown.is_cancelled() {
            advance(&mut state, ItemState::Abandoned);
            return report;
        }

        let request = GenerationRequest {
            source_image: avatar_image_url.to_string(),
            audio_url: item.audio_url,
            session_id,
            item_id: item.item_id,
        };

        let handle = match self.client.submit(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                advance(&mut state, ItemState::Failed);
                let kind = match e {
                    JobClientError::Validation(_) => FailureKind::Validation,
                    _ => FailureKind::Submission,
                };
                report.outcome = ItemOutcome::Failed {
                    kind,
                    detail: e.to_string(),
                };
                return report;
            }
        };

        advance(&mut state, ItemState::Submitted);
        report.provider_job_id = Some(handle.provider_job_id.clone());
        tracing::debug!(
            session_id = %session_id,
            item_id = %item.item_id,
            provider_job_id = %handle.provider_job_id,
            "Animation job submitted"
        );

        report.outcome = self
            .poll_to_terminal(&handle, item.item_id, &mut state, &mut report.attempts)
            .await;
        debug_assert!(state.is_terminal(), "item left in {:?}", state);
        report
    }

    /// Poll loop for one job; polls never overlap
    async fn poll_to_terminal(
        &self,
        handle: &JobHandle,
        item_id: Uuid,
        state: &mut ItemState,
        attempts: &mut u32,
    ) -> ItemOutcome {
        let mut last_error: Option<String> = None;

        while *attempts < self.policy.max_attempts {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    advance(state, ItemState::Abandoned);
                    return ItemOutcome::Abandoned;
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }

            *attempts += 1;
            advance(state, ItemState::Polling);

            let response = match self.client.poll(handle).await {
                Ok(response) => response,
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        item_id = %item_id,
                        provider_job_id = %handle.provider_job_id,
                        attempt = *attempts,
                        error = %e,
                        "Transient poll error"
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
                Err(e) => {
                    advance(state, ItemState::Failed);
                    return ItemOutcome::Failed {
                        kind: FailureKind::Poll,
                        detail: e.to_string(),
                    };
                }
            };

            tracing::debug!(
                item_id = %item_id,
                provider_job_id = %handle.provider_job_id,
                attempt = *attempts,
                status = ?response.status(),
                "Poll observation"
            );

            match response {
                ProviderResponse::Pending | ProviderResponse::Running => continue,
                ProviderResponse::Succeeded {
                    output: Some(output_url),
                } => {
                    let result = JobResult::succeeded(item_id, output_url.clone());
                    return match self.persist_output(&result).await {
                        Ok(()) => {
                            advance(state, ItemState::Succeeded);
                            ItemOutcome::Succeeded { output_url }
                        }
                        Err(e) => {
                            advance(state, ItemState::Failed);
                            ItemOutcome::Failed {
                                kind: FailureKind::Persistence,
                                detail: e.to_string(),
                            }
                        }
                    };
                }
                ProviderResponse::Succeeded { output: None } => {
                    advance(state, ItemState::Failed);
                    return ItemOutcome::Failed {
                        kind: FailureKind::MalformedSuccess,
                        detail: "provider reported success without an output URL".to_string(),
                    };
                }
                ProviderResponse::Failed { detail } => {
                    advance(state, ItemState::Failed);
                    return ItemOutcome::Failed {
                        kind: FailureKind::ProviderReported,
                        detail: detail.unwrap_or_else(|| "provider reported failure".to_string()),
                    };
                }
                ProviderResponse::Canceled { detail } => {
                    advance(state, ItemState::Failed);
                    return ItemOutcome::Failed {
                        kind: FailureKind::ProviderReported,
                        detail: detail.unwrap_or_else(|| "job canceled by provider".to_string()),
                    };
                }
            }
        }

        advance(state, ItemState::TimedOut);
        ItemOutcome::TimedOut {
            detail: last_error.map(|e| format!("poll ceiling reached; last error: {}", e)),
        }
    }

    /// Merge a result into its message's metadata
    ///
    /// Failed results carry no output and leave storage untouched.
    async fn persist_output(&self, result: &JobResult) -> studio_common::Result<()> {
        let Some(output_url) = result.output_url.as_deref() else {
            return Ok(());
        };

        db::messages::merge_message_metadata(
            &self.db,
            result.item_id,
            ANIMATED_VIDEO_URL_KEY,
            Value::String(output_url.to_string()),
        )
        .await
        .map(|_| ())
    }
}
