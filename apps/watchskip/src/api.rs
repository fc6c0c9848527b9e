//! # HTTP API
//!
//! axum router for the prediction service.
//!
//! | method | path        | body               | response                        |
//! |--------|-------------|--------------------|---------------------------------|
//! | GET    | `/`         |                    | `{"message": ...}`              |
//! | POST   | `/predict/` | `{"url": "<link>"}`| `{"decision", "features"}`      |
//!
//! Errors are returned as `{"detail": "<message>"}` with status 400 for a
//! missing or malformed URL or an unreadable body, 404 for an unknown video and 500 otherwise.

use crate::youtube::{FetchError, VideoSource};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use watchskip_core::{
    Decision, FeatureVector, SentimentScorer, TrainedModel, extract_video_id,
};

/// Health-check message.
pub const HEALTH_MESSAGE: &str = "Backend is running";

// =============================================================================
// STATE
// =============================================================================

/// Shared, read-only service state.
#[derive(Clone)]
pub struct AppState {
    model: Arc<TrainedModel>,
    source: Arc<dyn VideoSource>,
    scorer: Arc<dyn SentimentScorer>,
}

impl AppState {
    pub fn new(
        model: TrainedModel,
        source: impl VideoSource + 'static,
        scorer: impl SentimentScorer + 'static,
    ) -> Self {
        Self {
            model: Arc::new(model),
            source: Arc::new(source),
            scorer: Arc::new(scorer),
        }
    }

    #[must_use]
    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// URL in, decision out: extract the ID, fetch metadata, derive
    /// features, classify.
    pub async fn predict(&self, url: &str) -> Result<PredictResponse, ApiError> {
        let video_id = extract_video_id(url).map_err(|_| ApiError::InvalidUrl)?;
        info!(video_id = %video_id, "extracted video id");

        let metadata = self
            .source
            .fetch(&video_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let features = FeatureVector::derive(&metadata, self.scorer.as_ref());
        info!(
            log_views = features.log_views,
            likes = features.likes,
            comment_count = features.comments,
            like_ratio = features.like_ratio,
            sentiment = features.sentiment,
            "derived features"
        );

        let decision = self.model.decide(&features);
        info!(%decision, "model prediction");

        Ok(PredictResponse { decision, features })
    }
}

// =============================================================================
// REQUEST / RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

/// Body of `POST /predict/`. A missing `url` is treated as malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub decision: Decision,
    pub features: FeatureVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failures surfaced by the prediction endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("Video not found")]
    NotFound,

    /// The body is not a JSON object with a string `url`.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    Fetch(#[from] FetchError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidUrl | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "prediction failed");
        } else {
            warn!(error = %self, "prediction rejected");
        }
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the router with permissive CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_handler))
        .route("/predict/", post(predict_handler))
        .route("/predict", post(predict_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: HEALTH_MESSAGE.to_owned(),
    })
}

async fn predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    info!(url = ?request.url, "received prediction request");
    let url = request.url.as_deref().ok_or(ApiError::InvalidUrl)?;
    state.predict(url).await.map(Json)
}
