//! Message record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ItemMetadata;

/// Raw role value stored for host (AI interviewer) messages
pub const HOST_ROLE: &str = "ai";

/// One utterance in a session transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    /// Raw role as stored ("ai", "user", ...)
    pub role: String,
    pub text: String,
    /// Chronological order key (epoch milliseconds)
    pub timestamp: i64,
    /// Offset from session start (milliseconds)
    pub relative_offset: i64,
    pub audio_url: Option<String>,
    pub metadata: Option<ItemMetadata>,
    pub created_at: DateTime<Utc>,
}

/// Transcript speaker label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerRole {
    Host,
    Guest,
}

impl SpeakerRole {
    /// Map a stored role to a speaker; anything other than the host role is a guest
    pub fn from_role(role: &str) -> Self {
        if role == HOST_ROLE {
            SpeakerRole::Host
        } else {
            SpeakerRole::Guest
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeakerRole::Host => "Host",
            SpeakerRole::Guest => "Guest",
        }
    }
}

impl Message {
    /// Create a message with no audio and no metadata
    pub fn new(session_id: Uuid, role: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role: role.into(),
            text: text.into(),
            timestamp,
            relative_offset: 0,
            audio_url: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_audio(mut self, audio_url: impl Into<String>) -> Self {
        self.audio_url = Some(audio_url.into());
        self
    }

    pub fn speaker(&self) -> SpeakerRole {
        SpeakerRole::from_role(&self.role)
    }

    pub fn is_host(&self) -> bool {
        self.speaker() == SpeakerRole::Host
    }

    /// Audio reference if present and not blank
    pub fn usable_audio(&self) -> Option<&str> {
        self.audio_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn has_metadata_key(&self, key: &str) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.contains_key(key))
    }
}
