//! Test Helper Utilities
//!
//! Shared utilities for testing studio-gen

// Each test binary uses a different subset of these helpers
#![allow(dead_code, unused_imports)]

pub mod db_utils;
pub mod fake_provider;
pub mod scripted_clients;

pub use db_utils::{create_test_db, seed_guest_message, seed_host_message, seed_session};
pub use fake_provider::{spawn_fake_provider, FakeProvider};
pub use scripted_clients::{Script, ScriptedCompletionClient, ScriptedJobClient, Step};
