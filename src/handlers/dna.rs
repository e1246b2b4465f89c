//! Organizational DNA handlers

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::dna::{DnaBuilder, IngestReport};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct IngestDocumentRequest {
    pub name: String,
    pub text: String,
}

/// Ingest one document into the organizational knowledge graph
pub async fn ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestDocumentRequest>,
) -> AppResult<Json<IngestReport>> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("document name is required".into()));
    }
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("document text is required".into()));
    }

    let builder = DnaBuilder::new(state.llm.clone(), state.graph.clone());
    let report = builder.ingest_document(&req.name, &req.text).await?;
    Ok(Json(report))
}
