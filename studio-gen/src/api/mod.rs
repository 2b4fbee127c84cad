//! HTTP API handlers for studio-gen
//!
//! REST endpoints trigger generation; SSE reports progress.

pub mod generation;
pub mod health;
pub mod sse;

pub use generation::{generation_routes, RequesterId, USER_ID_HEADER};
pub use health::health_routes;
pub use sse::event_stream;
