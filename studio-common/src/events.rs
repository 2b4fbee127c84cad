//! Event types for the studio event system
//!
//! Generation progress is broadcast on an [`EventBus`] so that SSE clients and
//! logs can observe per-item outcomes without polling the database.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Studio event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StudioEvent {
    /// Animation batch accepted and eligibility filter applied
    AnimationBatchStarted {
        session_id: Uuid,
        /// Items that will enter the per-item state machine
        eligible: usize,
        /// Items filtered out before submission
        skipped: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One item reached a terminal state
    AnimationItemCompleted {
        session_id: Uuid,
        item_id: Uuid,
        /// "succeeded", "failed", "timed_out" or "abandoned"
        outcome: String,
        /// Output reference, present only for "succeeded"
        output_url: Option<String>,
        /// Failure detail, present for non-success outcomes
        detail: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Batch finished (possibly with partial failure)
    AnimationBatchCompleted {
        session_id: Uuid,
        attempted: usize,
        succeeded: usize,
        failed: usize,
        timed_out: usize,
        abandoned: usize,
        skipped: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Batch could not start (configuration, missing session)
    AnimationBatchFailed {
        session_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session summary generated and persisted
    SummaryGenerated {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Summary generation failed
    SummaryFailed {
        session_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl StudioEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            StudioEvent::AnimationBatchStarted { .. } => "AnimationBatchStarted",
            StudioEvent::AnimationItemCompleted { .. } => "AnimationItemCompleted",
            StudioEvent::AnimationBatchCompleted { .. } => "AnimationBatchCompleted",
            StudioEvent::AnimationBatchFailed { .. } => "AnimationBatchFailed",
            StudioEvent::SummaryGenerated { .. } => "SummaryGenerated",
            StudioEvent::SummaryFailed { .. } => "SummaryFailed",
        }
    }

    /// Session this event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            StudioEvent::AnimationBatchStarted { session_id, .. }
            | StudioEvent::AnimationItemCompleted { session_id, .. }
            | StudioEvent::AnimationBatchCompleted { session_id, .. }
            | StudioEvent::AnimationBatchFailed { session_id, .. }
            | StudioEvent::SummaryGenerated { session_id, .. }
            | StudioEvent::SummaryFailed { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast bus for [`StudioEvent`]s
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StudioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped for slow receivers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StudioEvent,
    ) -> Result<usize, broadcast::error::SendError<StudioEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: StudioEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
