// HTTP request handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppServer;
use crate::pipeline::{MoodLabel, TurnResponse};
use crate::resources::ResourcesPayload;

const TEST_MESSAGE: &str = "I'm feeling anxious today";
const TEST_EMOTION: &str = "anxious";

/// Create the main application router
pub fn create_router(server: Arc<AppServer>) -> Router {
    Router::new()
        .route("/chat", post(handle_chat))
        .route("/resources", get(get_resources))
        .route("/status", get(get_status))
        .route("/test_response", get(test_response))
        .route("/health", get(health_check))
        .with_state(server)
}

/// Chat request from the client app
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Emotion the user picked in the app, if any
    #[serde(default)]
    pub emotion: Option<String>,
}

/// Handle POST /chat - Run one turn through the pipeline
async fn handle_chat(
    State(server): State<Arc<AppServer>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::bad_request("message must not be empty"));
    }

    let emotion = request
        .emotion
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let response = server.pipeline().process_turn(message, emotion).await;
    Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourcesQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// Handle GET /resources - Cached informational pages
async fn get_resources(
    State(server): State<Arc<AppServer>>,
    Query(query): Query<ResourcesQuery>,
) -> Result<Json<ResourcesPayload>, AppError> {
    let payload = server
        .library()
        .load(server.scraper(), query.refresh)
        .await?;
    Ok(Json(payload))
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub text_generation: bool,
    pub instruction_llm: bool,
    pub crisis_classifier: String,
    pub history_size: usize,
    pub history_capacity: usize,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
}

/// Handle GET /status - Capability availability
async fn get_status(State(server): State<Arc<AppServer>>) -> Json<StatusResponse> {
    let pipeline = server.pipeline();

    Json(StatusResponse {
        text_generation: pipeline.generation_available(),
        instruction_llm: pipeline.llm_available(),
        crisis_classifier: pipeline.classifier_name().to_string(),
        history_size: pipeline.history().len(),
        history_capacity: pipeline.history().capacity(),
        started_at: server.started(),
        uptime_seconds: server.uptime_seconds(),
    })
}

/// Canned turn result
#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub message: &'static str,
    pub emotion: &'static str,
    pub candidate: String,
    pub candidate_outcome: &'static str,
    pub response: String,
    pub detected_mood: Option<MoodLabel>,
}

/// Handle GET /test_response - Run a canned message end to end
async fn test_response(State(server): State<Arc<AppServer>>) -> Json<TestResponse> {
    let (response, trace) = server
        .pipeline()
        .process_turn_traced(TEST_MESSAGE, Some(TEST_EMOTION))
        .await;

    Json(TestResponse {
        message: TEST_MESSAGE,
        emotion: TEST_EMOTION,
        candidate: trace.candidate,
        candidate_outcome: trace.candidate_outcome,
        response: response.final_text,
        detected_mood: response.detected_mood,
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_seconds: u64,
}

/// Handle GET /health - Health check endpoint
pub async fn health_check(State(server): State<Arc<AppServer>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        uptime_seconds: server.uptime_seconds(),
    })
}

/// Application error wrapper for proper HTTP error responses
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: anyhow::anyhow!(message.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_type = if self.status.is_client_error() {
            tracing::warn!(error = %self.error, "Rejected request");
            "invalid_request_error"
        } else {
            tracing::error!(error = %format!("{:#}", self.error), "Request failed");
            "api_error"
        };

        let body = serde_json::json!({
            "error": {
                "message": self.error.to_string(),
                "type": error_type
            }
        });

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}
