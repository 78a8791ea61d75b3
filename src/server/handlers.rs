//! Request handlers

use std::sync::Arc;
use std::time::Instant;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::explainability::ExplanationResult;
use crate::inference::PredictionResult;

use super::error::{Result, ServerError};
use super::state::AppState;

// ============================================================================
// Inference
// ============================================================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<PredictionResult>> {
    let body = body?;
    let started = Instant::now();
    let predictor = state.predictor.clone();

    // Tree traversal is CPU bound; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || predictor.predict_body(&body))
        .await
        .map_err(|e| ServerError::Internal(format!("Prediction task failed: {}", e)))??;

    info!(
        prediction = result.prediction,
        probability = ?result.probability,
        latency_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Served prediction"
    );
    Ok(Json(result))
}

pub async fn explain(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<ExplanationResult>> {
    let body = body?;
    let result = state.explainer.explain_body(&body)?;
    info!(
        features = ?result.top_features.iter().map(|f| f.feature.as_str()).collect::<Vec<_>>(),
        "Served explanation"
    );
    Ok(Json(result))
}

// ============================================================================
// System
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let meta = state.pipeline.metadata();
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime.num_seconds(),
        "model": {
            "type": meta.model_type,
            "params": state.pipeline.params(),
            "trained_at": meta.trained_at.to_rfc3339(),
            "cv_mean_f1": meta.cv_mean_f1,
            "input_features": meta.input_features,
            "drift_policy": state.config.drift_policy.to_string(),
        },
    }))
}
