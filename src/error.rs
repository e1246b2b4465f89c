//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::llm::LlmError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Request errors
    BadRequest(String),

    // External collaborator errors
    LlmError(String),
    GraphError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::LlmError(msg) => {
                tracing::error!("LLM error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Language model error")
            }
            AppError::GraphError(msg) => {
                tracing::error!("Graph error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Graph store error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::LlmError(err.to_string())
    }
}

impl From<crate::graph::GraphError> for AppError {
    fn from(err: crate::graph::GraphError) -> Self {
        AppError::GraphError(err.to_string())
    }
}
