//! Database Test Utilities

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use studio_gen::models::{Message, Session};
use uuid::Uuid;

/// In-memory database with the service tables
///
/// A single connection keeps every query on the same in-memory database.
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    studio_gen::db::init_tables(&pool)
        .await
        .expect("Failed to initialize database schema");

    pool
}

/// Insert a session owned by a fresh user
pub async fn seed_session(pool: &SqlitePool, animate_avatar: bool) -> Session {
    let mut session = Session::new(Uuid::new_v4(), "curious".into(), "interview".into(), 30);
    session.metadata = json!({"animateAvatar": animate_avatar, "theme": "dark"})
        .as_object()
        .cloned();

    studio_gen::db::sessions::insert_session(pool, &session)
        .await
        .expect("Failed to insert session");
    session
}

/// Insert a host message; `audio_url` of `None` leaves the column NULL
pub async fn seed_host_message(
    pool: &SqlitePool,
    session: &Session,
    audio_url: Option<&str>,
    timestamp: i64,
) -> Message {
    let mut message = Message::new(session.id, "ai", format!("Question {}", timestamp), timestamp);
    message.audio_url = audio_url.map(str::to_string);
    // A key owned by another subsystem that must survive merges
    message.metadata = json!({"voice": "alloy"}).as_object().cloned();

    studio_gen::db::messages::insert_message(pool, &message)
        .await
        .expect("Failed to insert message");
    message
}

pub async fn seed_guest_message(
    pool: &SqlitePool,
    session: &Session,
    text: &str,
    timestamp: i64,
) -> Message {
    let message = Message::new(session.id, "user", text, timestamp)
        .with_audio(format!("https://audio.test/guest-{}.mp3", timestamp));

    studio_gen::db::messages::insert_message(pool, &message)
        .await
        .expect("Failed to insert message");
    message
}
