//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use phishguard_core::LabelScore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::any::Any;
use std::time::Instant;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error};

use crate::error::AppError;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/phishing", post(classify_phishing))
        .route("/phishing/score", post(score_phishing))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// Body accepted by both classification routes
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub url: String,
}

/// Raw classifier output next to the submitted URL
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub url: String,
    pub result: Vec<LabelScore>,
}

/// Classifier output reduced to one phishing probability
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub url: String,
    pub phishing_score: f32,
    pub result: Vec<LabelScore>,
}

/// Forward the URL verbatim to the classifier
async fn classify_phishing(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, AppError> {
    metrics::counter!("phishguard_requests_total", "route" => "phishing").increment(1);
    let Json(req) = payload?;

    let result = run_classifier(&state, &req.url).await?;

    Ok(Json(ClassifyResponse {
        url: req.url,
        result,
    }))
}

/// Normalize the target, classify it and derive a phishing score
async fn score_phishing(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, AppError> {
    metrics::counter!("phishguard_requests_total", "route" => "score").increment(1);
    let Json(req) = payload?;

    let url = state.scorer.normalize_target(&req.url)?;
    let result = run_classifier(&state, &url).await?;
    let phishing_score = state.scorer.phishing_score(&url, &result);
    debug!("Phishing score for {}: {}", url, phishing_score);

    Ok(Json(ScoreResponse {
        url,
        phishing_score,
        result,
    }))
}

async fn run_classifier(state: &AppState, text: &str) -> Result<Vec<LabelScore>, AppError> {
    let start = Instant::now();
    let result = state.classifier.classify(text).await?;
    let latency_us = start.elapsed().as_micros() as f64;

    metrics::histogram!("phishguard_inference_latency_us").record(latency_us);
    debug!(
        "Classified {:?} with '{}' in {}us: {:?}",
        text,
        state.classifier.name(),
        latency_us,
        result
    );

    Ok(result)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Request handler panicked: {}", detail);
    metrics::counter!("phishguard_errors_total", "kind" => "panic").increment(1);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal Server Error" })),
    )
        .into_response()
}

async fn fallback() -> AppError {
    AppError::NotFound
}
