//! External job client abstraction
//!
//! A narrow submit/poll protocol over a remote generation provider. Provider
//! JSON never crosses this boundary; implementations decode it into
//! [`ProviderResponse`].

use async_trait::async_trait;
use thiserror::Error;

use crate::error::GenerationError;
use crate::models::{GenerationRequest, JobHandle, ProviderResponse};

/// Job client errors
#[derive(Debug, Error)]
pub enum JobClientError {
    /// Credential absent; caller must not retry
    #[error("Provider not configured: {0}")]
    Configuration(String),

    /// Payload rejected before any network call
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    Parse(String),
}

impl JobClientError {
    /// Whether repeating the same call might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            JobClientError::Network(_) | JobClientError::Parse(_) => true,
            JobClientError::Api(status, _) => *status == 429 || *status >= 500,
            JobClientError::Configuration(_) | JobClientError::Validation(_) => false,
        }
    }
}

impl From<JobClientError> for GenerationError {
    fn from(err: JobClientError) -> Self {
        match err {
            JobClientError::Configuration(msg) => GenerationError::Configuration(msg),
            JobClientError::Validation(msg) => GenerationError::Validation(msg),
            JobClientError::Network(_) | JobClientError::Parse(_) => {
                GenerationError::TransientProvider(err.to_string())
            }
            JobClientError::Api(..) if err.is_transient() => {
                GenerationError::TransientProvider(err.to_string())
            }
            JobClientError::Api(..) => GenerationError::ProviderFailure(err.to_string()),
        }
    }
}

/// Remote generation provider
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Whether a credential is available
    fn is_configured(&self) -> bool;

    /// Submit one job; never retried internally
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, JobClientError>;

    /// Observe a job once
    ///
    /// A provider-reported failure is an `Ok` observation, not an error.
    async fn poll(&self, handle: &JobHandle) -> Result<ProviderResponse, JobClientError>;
}

/// Reject audio references the provider cannot fetch
///
/// Inline `data:` URIs and anything that is not an absolute http(s) URL fail
/// with `Validation`.
pub fn validate_audio_reference(reference: &str) -> Result<(), JobClientError> {
    let reference = reference.trim();

    if reference
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
    {
        return Err(JobClientError::Validation(
            "audio is an inline data URI; provider requires a network URL".to_string(),
        ));
    }

    let parsed = url::Url::parse(reference).map_err(|e| {
        JobClientError::Validation(format!("audio reference is not a URL: {}", e))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(JobClientError::Validation(format!(
            "unsupported audio URL scheme: {}",
            other
        ))),
    }
}
