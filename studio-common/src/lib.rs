//! # Studio Common Library
//!
//! Shared code for the studio services including:
//! - Common error type
//! - TOML configuration loading and root folder resolution
//! - Generation event types and the broadcast `EventBus`

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
