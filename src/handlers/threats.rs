//! Threat landscape handlers

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::correlate::{executive_summary, Correlator};
use crate::keywords::KeywordSet;
use crate::models::{RiskAssessment, ThreatLandscape};
use crate::pipeline::Pipeline;
use crate::{AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    /// Keywords grouped by category, e.g. {"technologies": ["kubernetes"]}.
    /// Categories are flattened; omitting the body falls back to the
    /// generic keyword set.
    pub keywords: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Serialize)]
pub struct CorrelateResponse {
    pub assessments: Vec<RiskAssessment>,
    pub executive_summary: String,
}

/// Run the collection agents and return the deduplicated landscape
pub async fn collect(
    State(state): State<AppState>,
    body: Option<Json<CollectRequest>>,
) -> AppResult<Json<ThreatLandscape>> {
    let keywords = match body {
        Some(Json(req)) => KeywordSet::from_categories(req.keywords.as_ref()),
        None => KeywordSet::fallback(),
    };

    let pipeline = Pipeline::new(
        state.config.clone(),
        state.http.clone(),
        state.llm.clone(),
        state.graph.clone(),
    );
    let landscape = pipeline.collect(keywords).await;
    Ok(Json(landscape))
}

/// Correlate a previously collected landscape against the graph
pub async fn correlate(
    State(state): State<AppState>,
    Json(landscape): Json<ThreatLandscape>,
) -> AppResult<Json<CorrelateResponse>> {
    let correlator = Correlator::new(state.llm.clone(), state.graph.clone());
    let assessments = correlator.correlate(&landscape).await;
    let summary = executive_summary(&assessments);

    Ok(Json(CorrelateResponse {
        assessments,
        executive_summary: summary,
    }))
}
