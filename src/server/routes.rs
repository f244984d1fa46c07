//! HTTP route handlers for the nutrition coach API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::coach::core::message::ChatMessage;
use crate::coach::core::nutrition::{FoodEntry, NutritionTotals};
use crate::coach::core::profile::NutritionGoals;
use crate::coach::core::topic::Topic;
use crate::coach::orchestrator::outcome::{RejectReason, SubmitOutcome};
use crate::coach::orchestrator::state::{QuickAction, TopicState, UserInput};

use super::state::AppState;

type ApiError = (StatusCode, String);

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/topics/{topic}/messages",
            get(list_messages).post(submit_message),
        )
        .route("/api/topics/{topic}/state", get(topic_state))
        .route("/api/topics/{topic}/images", post(submit_image))
        .route("/api/topics/{topic}/quick-actions", post(submit_quick_action))
        .route("/api/topics/{topic}/greeting", post(ensure_greeting))
        .route("/api/ledger/today", get(ledger_today))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "nutri-coach",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn parse_topic(raw: &str) -> Result<Topic, ApiError> {
    Topic::new(raw).map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid topic: {e}")))
}

/// Topic history response.
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    /// Topic the history belongs to.
    pub topic: Topic,
    /// Whether a request is in flight.
    pub state: TopicState,
    /// Messages, oldest first.
    pub messages: Vec<ChatMessage>,
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let topic = parse_topic(&topic)?;
    let orchestrator = &state.orchestrator;

    Ok(Json(MessagesResponse {
        state: orchestrator.state(&topic),
        messages: orchestrator.messages(&topic),
        topic,
    }))
}

/// Topic state response.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    /// Topic queried.
    pub topic: Topic,
    /// Current state.
    pub state: TopicState,
}

async fn topic_state(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> Result<Json<StateResponse>, ApiError> {
    let topic = parse_topic(&topic)?;
    Ok(Json(StateResponse {
        state: state.orchestrator.state(&topic),
        topic,
    }))
}

/// How a text submission was captured.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Typed by the user.
    #[default]
    Text,
    /// Transcribed speech.
    Voice,
}

/// Text or voice submission.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// Message text or transcript.
    pub text: String,
    /// Capture source.
    #[serde(default)]
    pub source: TextSource,
}

/// Image submission.
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    /// Base64-encoded image bytes.
    pub image_base64: String,
    /// Optional caption.
    #[serde(default)]
    pub caption: String,
}

/// Quick action submission.
#[derive(Debug, Deserialize)]
pub struct QuickActionRequest {
    /// Action to run.
    pub action: QuickAction,
}

fn outcome_response(outcome: SubmitOutcome) -> (StatusCode, Json<SubmitOutcome>) {
    let status = match &outcome {
        SubmitOutcome::Rejected {
            reason: RejectReason::Busy,
        } => StatusCode::CONFLICT,
        SubmitOutcome::Rejected {
            reason: RejectReason::EmptyInput,
        } => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitOutcome::Logged { .. }
        | SubmitOutcome::Replied { .. }
        | SubmitOutcome::Failed { .. } => StatusCode::OK,
    };
    (status, Json(outcome))
}

async fn submit_message(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<(StatusCode, Json<SubmitOutcome>), ApiError> {
    let topic = parse_topic(&topic)?;
    let input = match request.source {
        TextSource::Text => UserInput::Text(request.text),
        TextSource::Voice => UserInput::Voice(request.text),
    };
    Ok(outcome_response(
        state.orchestrator.submit(&topic, input).await,
    ))
}

async fn submit_image(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Json(request): Json<ImageRequest>,
) -> Result<(StatusCode, Json<SubmitOutcome>), ApiError> {
    let topic = parse_topic(&topic)?;
    let data = STANDARD
        .decode(request.image_base64.trim())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid image encoding: {e}")))?;
    Ok(outcome_response(
        state
            .orchestrator
            .submit_image(&topic, data, request.caption)
            .await,
    ))
}

async fn submit_quick_action(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Json(request): Json<QuickActionRequest>,
) -> Result<(StatusCode, Json<SubmitOutcome>), ApiError> {
    let topic = parse_topic(&topic)?;
    Ok(outcome_response(
        state
            .orchestrator
            .submit_quick_action(&topic, request.action)
            .await,
    ))
}

/// Greeting response.
#[derive(Debug, Serialize)]
pub struct GreetingResponse {
    /// Whether the welcome message was appended by this call.
    pub greeted: bool,
}

async fn ensure_greeting(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> Result<Json<GreetingResponse>, ApiError> {
    let topic = parse_topic(&topic)?;
    Ok(Json(GreetingResponse {
        greeted: state.orchestrator.ensure_greeting(&topic).is_some(),
    }))
}

/// Today's ledger view.
#[derive(Debug, Serialize)]
pub struct LedgerTodayResponse {
    /// Entries logged since midnight UTC.
    pub entries: Vec<FoodEntry>,
    /// Sum over `entries`.
    pub totals: NutritionTotals,
    /// Current daily targets.
    pub goals: NutritionGoals,
}

async fn ledger_today(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LedgerTodayResponse>, ApiError> {
    let orchestrator = &state.orchestrator;
    let now = Utc::now();
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |start| start.and_utc());

    let entries = orchestrator
        .ledger()
        .entries_between(orchestrator.user_id(), midnight, now)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Ledger error: {e}")))?;

    Ok(Json(LedgerTodayResponse {
        totals: NutritionTotals::from_entries(&entries),
        goals: orchestrator.profiles().nutrition_goals(),
        entries,
    }))
}
