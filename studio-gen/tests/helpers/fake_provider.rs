//! Local fake of the Replicate and Gemini HTTP APIs
//!
//! Bound to 127.0.0.1:0; requests are recorded for assertions.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const FAKE_TOKEN: &str = "test-token";
pub const FAKE_KEY: &str = "test-key";

#[derive(Clone, Default)]
struct Recorded {
    prediction_bodies: Arc<Mutex<Vec<Value>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

pub struct FakeProvider {
    pub base_url: String,
    recorded: Recorded,
}

impl FakeProvider {
    /// Bodies of accepted prediction create requests
    pub fn prediction_bodies(&self) -> Vec<Value> {
        self.recorded.prediction_bodies.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.recorded.prompts.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Token {}", FAKE_TOKEN))
}

async fn create_prediction(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid token"})),
        );
    }
    recorded.prediction_bodies.lock().unwrap().push(body);
    (
        StatusCode::CREATED,
        Json(json!({"id": "pred-ok", "status": "starting", "output": null, "error": null})),
    )
}

/// Prediction state is chosen by id
async fn get_prediction(headers: HeaderMap, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid token"})),
        );
    }
    match id.as_str() {
        "pred-ok" => (
            StatusCode::OK,
            Json(json!({"id": id, "status": "succeeded", "output": "https://replicate.test/out.mp4"})),
        ),
        "pred-list" => (
            StatusCode::OK,
            Json(json!({"id": id, "status": "succeeded", "output": ["https://replicate.test/a.mp4"]})),
        ),
        "pred-running" => (
            StatusCode::OK,
            Json(json!({"id": id, "status": "processing", "output": null})),
        ),
        "pred-failed" => (
            StatusCode::OK,
            Json(json!({"id": id, "status": "failed", "error": "bad audio"})),
        ),
        "pred-garbage" => (StatusCode::OK, Json(json!("not a prediction"))),
        "pred-500" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "upstream"})),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found"}))),
    }
}

async fn generate_content(
    State(recorded): State<Recorded>,
    Path(model): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if query.get("key").map(String::as_str) != Some(FAKE_KEY) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"message": "API key not valid"}})),
        );
    }
    if model != "gemini-pro:generateContent" {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    recorded.prompts.lock().unwrap().push(prompt.clone());

    if prompt == "empty please" {
        return (StatusCode::OK, Json(json!({"candidates": []})));
    }

    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{"content": {"parts": [{"text": format!("Summary of: {}", prompt)}]}}]
        })),
    )
}

/// Start the fake provider on an ephemeral port
pub async fn spawn_fake_provider() -> FakeProvider {
    let recorded = Recorded::default();

    let app = Router::new()
        .route("/v1/predictions", post(create_prediction))
        .route("/v1/predictions/:id", get(get_prediction))
        .route("/v1beta/models/:model", post(generate_content))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake provider");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    FakeProvider {
        base_url: format!("http://{}", addr),
        recorded,
    }
}
