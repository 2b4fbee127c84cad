//! Provider job types
//!
//! The orchestrator only ever sees these types; provider-specific JSON is
//! decoded at the client boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input for one animation job
///
/// Built per eligible message at submission time and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Avatar image to animate
    pub source_image: String,
    /// Audio that drives the animation
    pub audio_url: String,
    pub session_id: Uuid,
    /// Message the result belongs to
    pub item_id: Uuid,
}

/// Provider-side identifier for a submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub provider_job_id: String,
    pub submitted_at: DateTime<Utc>,
}

impl JobHandle {
    pub fn new(provider_job_id: impl Into<String>) -> Self {
        Self {
            provider_job_id: provider_job_id.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Job status as tracked by the orchestrator
///
/// `TimedOut` is never reported by a provider; it is synthesized locally when
/// the poll ceiling is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    TimedOut,
}

/// One decoded poll observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResponse {
    Pending,
    Running,
    /// `output` is `None` when the provider claimed success without a usable output
    Succeeded { output: Option<String> },
    Failed { detail: Option<String> },
    Canceled { detail: Option<String> },
}

impl ProviderResponse {
    pub fn status(&self) -> JobStatus {
        match self {
            ProviderResponse::Pending => JobStatus::Pending,
            ProviderResponse::Running => JobStatus::Running,
            ProviderResponse::Succeeded { .. } => JobStatus::Succeeded,
            ProviderResponse::Failed { .. } => JobStatus::Failed,
            ProviderResponse::Canceled { .. } => JobStatus::Canceled,
        }
    }
}

/// Terminal result for one item
///
/// Exactly one of `output_url` / `error_detail` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub item_id: Uuid,
    pub output_url: Option<String>,
    pub error_detail: Option<String>,
}

impl JobResult {
    pub fn succeeded(item_id: Uuid, output_url: impl Into<String>) -> Self {
        Self {
            item_id,
            output_url: Some(output_url.into()),
            error_detail: None,
        }
    }

    pub fn failed(item_id: Uuid, error_detail: impl Into<String>) -> Self {
        Self {
            item_id,
            output_url: None,
            error_detail: Some(error_detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_result_exclusive_fields() {
        let id = Uuid::new_v4();
        let ok = JobResult::succeeded(id, "https://out/v.mp4");
        assert_eq!(ok.output_url.as_deref(), Some("https://out/v.mp4"));
        assert!(ok.error_detail.is_none());

        let err = JobResult::failed(id, "bad audio");
        assert!(err.output_url.is_none());
        assert_eq!(err.error_detail.as_deref(), Some("bad audio"));
    }

    #[test]
    fn test_response_status() {
        assert_eq!(
            ProviderResponse::Succeeded { output: None }.status(),
            JobStatus::Succeeded
        );
        assert_eq!(
            ProviderResponse::Canceled { detail: None }.status(),
            JobStatus::Canceled
        );
    }
}
