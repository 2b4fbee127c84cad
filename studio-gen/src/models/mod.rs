//! Data models for studio-gen
//!
//! - Session and message records as loaded from storage
//! - Provider job types (request, handle, status, result)
//! - Per-item state machine and batch outcome

pub mod job;
pub mod message;
pub mod outcome;
pub mod session;

pub use job::{GenerationRequest, JobHandle, JobResult, JobStatus, ProviderResponse};
pub use message::{Message, SpeakerRole};
pub use outcome::{BatchOutcome, FailureKind, ItemOutcome, ItemReport, ItemState, SkipReason};
pub use session::{Session, SessionDescriptor};

/// Free-form metadata attached to sessions and messages
///
/// Several subsystems write keys into the same map; each one owns only its keys.
pub type ItemMetadata = serde_json::Map<String, serde_json::Value>;
