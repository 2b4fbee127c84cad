//! Session summary generation
//!
//! One prompt, one completion, one write. No internal retry; callers decide
//! whether to invoke again.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use studio_common::events::{EventBus, StudioEvent};
use uuid::Uuid;

use super::completion_client::CompletionClient;
use super::prompt_builder;
use crate::db;
use crate::error::GenerationError;

/// A persisted summary
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSummary {
    pub session_id: Uuid,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

pub struct SummaryGenerator {
    db: SqlitePool,
    client: Arc<dyn CompletionClient>,
    event_bus: EventBus,
}

impl SummaryGenerator {
    pub fn new(db: SqlitePool, client: Arc<dyn CompletionClient>, event_bus: EventBus) -> Self {
        Self {
            db,
            client,
            event_bus,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Generate, persist and return the summary of a session
    ///
    /// # Errors
    /// - `NotFound` if the session does not exist
    /// - `Configuration` if no completion credential is set
    /// - `EmptyTranscript` if the session has no messages
    /// - provider errors (`TransientProvider`, `ProviderFailure`, `MalformedSuccess`)
    /// - `Storage` if the write fails
    pub async fn generate(&self, session_id: Uuid) -> Result<GeneratedSummary, GenerationError> {
        tracing::info!(session_id = %session_id, "Generating session summary");

        match self.generate_inner(session_id).await {
            Ok(summary) => {
                tracing::info!(
                    session_id = %session_id,
                    summary_len = summary.summary.len(),
                    "Session summary generated"
                );
                self.event_bus.emit_lossy(StudioEvent::SummaryGenerated {
                    session_id,
                    timestamp: summary.generated_at,
                });
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Summary generation failed");
                self.event_bus.emit_lossy(StudioEvent::SummaryFailed {
                    session_id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn generate_inner(&self, session_id: Uuid) -> Result<GeneratedSummary, GenerationError> {
        let session = db::sessions::load_session(&self.db, session_id)
            .await?
            .ok_or_else(|| GenerationError::NotFound(format!("Session {} not found", session_id)))?;

        if !self.client.is_configured() {
            return Err(GenerationError::Configuration(
                "Summary provider credential not configured".to_string(),
            ));
        }

        let messages = db::messages::load_messages_ordered(&self.db, session_id).await?;
        if messages.is_empty() {
            return Err(GenerationError::EmptyTranscript(session_id));
        }

        let prompt = prompt_builder::build_summary_prompt(&session.descriptor(), &messages);
        let summary = self.client.complete(&prompt).await?;

        let generated_at = Utc::now();
        db::sessions::save_summary(&self.db, session_id, &summary, generated_at).await?;

        Ok(GeneratedSummary {
            session_id,
            summary,
            generated_at,
        })
    }
}
