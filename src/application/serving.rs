//! HTTP serving layer for the Champion composite.

use crate::application::composite::PredictorState;
use crate::domain::errors::WindowingError;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Deserialize)]
pub struct InvocationRequest {
    /// Raw OHLC rows, one `[target, f1, f2, f3]` vector per row.
    pub data: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub struct InvocationResponse {
    pub predictions: Vec<Vec<f64>>,
}

#[derive(Debug, Error)]
pub enum ServingError {
    #[error("bad_request: {0}")]
    BadRequest(String),

    #[error("inference_failed: {0}")]
    Inference(String),
}

impl From<WindowingError> for ServingError {
    fn from(e: WindowingError) -> Self {
        ServingError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ServingError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServingError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServingError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Assembles the API router around an immutable, preloaded predictor.
pub fn router(state: Arc<PredictorState>) -> Router {
    Router::new()
        .route("/invocations", post(invocations))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn invocations(
    State(state): State<Arc<PredictorState>>,
    Json(request): Json<InvocationRequest>,
) -> Result<Json<InvocationResponse>, ServingError> {
    let input = to_matrix(&request.data)?;

    // The model call is synchronous; run it on the blocking pool so slow
    // inferences do not stall other requests.
    let predictions = tokio::task::spawn_blocking(move || state.predict(&input))
        .await
        .map_err(|e| ServingError::Inference(e.to_string()))??;

    let predictions = predictions
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect();

    Ok(Json(InvocationResponse { predictions }))
}

fn to_matrix(data: &[Vec<f64>]) -> Result<Array2<f64>, ServingError> {
    let rows = data.len();
    if rows == 0 {
        return Err(ServingError::BadRequest("data must not be empty".into()));
    }
    let cols = data[0].len();
    if data.iter().any(|row| row.len() != cols) {
        return Err(ServingError::BadRequest(
            "all data rows must have the same length".into(),
        ));
    }

    let flat: Vec<f64> = data.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows, cols), flat)
        .map_err(|e| ServingError::BadRequest(e.to_string()))
}
