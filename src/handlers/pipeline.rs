//! Full pipeline handler

use axum::{extract::State, Json};

use crate::pipeline::{Pipeline, PipelineReport};
use crate::{AppResult, AppState};

/// Run every stage end to end and return the full intelligence package
pub async fn run(State(state): State<AppState>) -> AppResult<Json<PipelineReport>> {
    let pipeline = Pipeline::new(
        state.config.clone(),
        state.http.clone(),
        state.llm.clone(),
        state.graph.clone(),
    );
    let report = pipeline.run().await?;
    Ok(Json(report))
}
