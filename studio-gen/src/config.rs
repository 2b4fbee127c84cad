//! Configuration resolution for studio-gen
//!
//! Provider credentials resolve with Database → ENV → TOML priority. Job
//! tuning comes from the `[generation]` TOML table.

use sqlx::{Pool, Sqlite};
use std::time::Duration;
use studio_common::config::{GenerationSettings, TomlConfig};
use studio_common::Result;
use tracing::{info, warn};

/// Provider credential known to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// Avatar animation provider token
    ReplicateApiToken,
    /// Summary completion provider key
    GeminiApiKey,
}

impl Credential {
    /// Key in the `settings` table
    pub fn setting_key(self) -> &'static str {
        match self {
            Credential::ReplicateApiToken => "replicate_api_token",
            Credential::GeminiApiKey => "gemini_api_key",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            Credential::ReplicateApiToken => "STUDIO_REPLICATE_API_TOKEN",
            Credential::GeminiApiKey => "STUDIO_GEMINI_API_KEY",
        }
    }

    fn toml_value(self, toml_config: &TomlConfig) -> Option<&String> {
        match self {
            Credential::ReplicateApiToken => toml_config.replicate_api_token.as_ref(),
            Credential::GeminiApiKey => toml_config.gemini_api_key.as_ref(),
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Credential::ReplicateApiToken => "Replicate API token",
            Credential::GeminiApiKey => "Gemini API key",
        }
    }
}

/// Resolve a provider credential from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
///
/// Returns `Ok(None)` when no tier holds a usable value. A missing credential
/// is not a startup failure; operations needing it fail with a configuration
/// error instead.
pub async fn resolve_credential(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
    credential: Credential,
) -> Result<Option<String>> {
    let name = credential.display_name();
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_key = crate::db::settings::get_setting(db, credential.setting_key())
        .await?
        .filter(|k| is_valid_key(k));
    if db_key.is_some() {
        sources.push("database");
    }

    // Tier 2: Environment variable
    let env_key = std::env::var(credential.env_var())
        .ok()
        .filter(|k| is_valid_key(k));
    if env_key.is_some() {
        sources.push("environment");
    }

    // Tier 3: TOML config
    let toml_key = credential
        .toml_value(toml_config)
        .filter(|k| is_valid_key(k))
        .cloned();
    if toml_key.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            sources[0]
        );
    }

    let resolved = db_key.or(env_key).or(toml_key);
    match (&resolved, sources.first()) {
        (Some(_), Some(source)) => info!("{} loaded from {}", name, source),
        _ => warn!(
            "{} not configured (settings table, {} or TOML `{}`)",
            name,
            credential.env_var(),
            credential.setting_key()
        ),
    }

    Ok(resolved)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Polling behaviour for one provider job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before each poll
    pub interval: Duration,
    /// Maximum polls per job; reaching it is a timeout
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&GenerationSettings::default())
    }
}

impl From<&GenerationSettings> for PollPolicy {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.poll_interval_secs),
            max_attempts: settings.max_poll_attempts.max(1),
        }
    }
}

/// Runtime tuning for generation jobs
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub poll: PollPolicy,
    /// Timeout for each provider HTTP request
    pub request_timeout: Duration,
    /// Items in flight at once within one batch
    pub max_concurrent_items: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::from(&GenerationSettings::default())
    }
}

impl From<&GenerationSettings> for GenerationConfig {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            poll: PollPolicy::from(settings),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            max_concurrent_items: settings.max_concurrent_items.max(1),
        }
    }
}
