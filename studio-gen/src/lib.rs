//! studio-gen library interface
//!
//! Generation job orchestration for recorded sessions: summaries and
//! talking-avatar animation.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, GenerationError};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use studio_common::events::EventBus;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

use crate::services::{AnimationOrchestrator, SummaryGenerator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub orchestrator: Arc<AnimationOrchestrator>,
    pub summary: Arc<SummaryGenerator>,
    /// Cancelled on process shutdown; stops poll loops and SSE streams
    pub shutdown: CancellationToken,
    /// Background animation batches; drained before the process exits
    pub tasks: TaskTracker,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        orchestrator: Arc<AnimationOrchestrator>,
        summary: Arc<SummaryGenerator>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            db,
            event_bus,
            orchestrator,
            summary,
            shutdown,
            tasks: TaskTracker::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::generation_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
