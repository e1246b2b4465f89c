//! PIR handlers

use axum::{extract::State, Json};

use crate::pir::{PirGenerator, PirReport};
use crate::{AppResult, AppState};

/// Generate Priority Intelligence Requirements from the current graph
pub async fn generate(State(state): State<AppState>) -> AppResult<Json<PirReport>> {
    let generator = PirGenerator::new(state.llm.clone(), state.graph.clone());
    let report = generator.generate().await?;
    Ok(Json(report))
}
