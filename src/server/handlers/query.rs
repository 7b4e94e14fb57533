use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    tracing::info!("Received query: {}", question);
    let answer = state.answerer.answer(question).await?;
    Ok(Json(QueryResponse { answer }))
}
