//! Generation services
//!
//! - Provider adapters behind [`JobClient`] and [`CompletionClient`]
//! - Prompt assembly and metadata merge (pure)
//! - Summary generator and avatar animation orchestrator

pub mod access;
pub mod animation_orchestrator;
pub mod completion_client;
pub mod job_client;
pub mod metadata_merge;
pub mod prompt_builder;
pub mod replicate_client;
pub mod summary_generator;

pub use access::authorize_session;
pub use animation_orchestrator::{AnimationOrchestrator, AnimationRequest};
pub use completion_client::{CompletionClient, CompletionError, GeminiClient};
pub use job_client::{validate_audio_reference, JobClient, JobClientError};
pub use metadata_merge::{merge, ANIMATED_VIDEO_URL_KEY};
pub use replicate_client::ReplicateClient;
pub use summary_generator::{GeneratedSummary, SummaryGenerator};
