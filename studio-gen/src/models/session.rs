//! Session record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ItemMetadata;

/// Session metadata flag that enables avatar animation for a session
pub const ANIMATE_AVATAR_KEY: &str = "animateAvatar";

/// Recorded interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Owner of the session
    pub user_id: Uuid,
    /// Host style chosen for the interview
    pub vibe: String,
    /// Interview mode
    pub mode: String,
    pub duration_minutes: i64,
    pub summary: Option<String>,
    pub summary_generated_at: Option<DateTime<Utc>>,
    pub metadata: Option<ItemMetadata>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The session fields that feed the summary prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub host_style: String,
    pub mode: String,
    pub duration_minutes: i64,
}

impl Session {
    /// Create a new draft session owned by `user_id`
    pub fn new(user_id: Uuid, vibe: String, mode: String, duration_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            vibe,
            mode,
            duration_minutes,
            summary: None,
            summary_generated_at: None,
            metadata: None,
            status: "draft".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn descriptor(&self) -> SessionDescriptor {
        SessionDescriptor {
            host_style: self.vibe.clone(),
            mode: self.mode.clone(),
            duration_minutes: self.duration_minutes,
        }
    }

    /// Avatar animation is enabled only by an explicit boolean `true`
    pub fn animation_enabled(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(ANIMATE_AVATAR_KEY))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}
