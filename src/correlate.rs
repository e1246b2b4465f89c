//! Correlation stage
//!
//! Assesses collected threats against organizational context to produce
//! ranked risk assessments. The reasoning itself is delegated to the
//! language model; the structural contract here is bounded per-run work,
//! per-threat failure isolation, and score-descending ordering of the
//! returned list.

use std::sync::Arc;

use serde::Deserialize;

use crate::graph::GraphStore;
use crate::llm::{recover_json, LanguageModel};
use crate::models::{
    truncate_chars, OrganizationContext, RiskAssessment, ThreatItem, ThreatLandscape,
};

/// Per-run bounds on how many items from each bucket get an LLM call.
const MAX_VULNERABILITIES: usize = 10;
const MAX_INDICATORS: usize = 10;

/// Character budget for description text embedded in prompts.
const DESCRIPTION_BUDGET: usize = 300;
const PATTERN_BUDGET: usize = 100;

/// The portion of an assessment the model is asked to produce.
#[derive(Debug, Deserialize)]
struct ModelAssessment {
    #[serde(default)]
    risk_score: f64,
    #[serde(default)]
    affected_assets: Vec<String>,
    #[serde(default)]
    business_impact: String,
    #[serde(default)]
    reasoning: String,
}

pub struct Correlator {
    llm: Arc<dyn LanguageModel>,
    graph: Arc<dyn GraphStore>,
}

impl Correlator {
    pub fn new(llm: Arc<dyn LanguageModel>, graph: Arc<dyn GraphStore>) -> Self {
        Self { llm, graph }
    }

    /// Assess each threat in the landscape against organizational context.
    /// Per-threat failures are logged and dropped; the returned list is
    /// always sorted by risk score descending.
    pub async fn correlate(&self, landscape: &ThreatLandscape) -> Vec<RiskAssessment> {
        let context = self.graph.context_summary().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "graph context unavailable for correlation");
            OrganizationContext::default()
        });

        let mut assessments = Vec::new();

        tracing::info!(
            vulnerabilities = landscape.vulnerabilities.len(),
            indicators = landscape.indicators.len(),
            "starting threat correlation"
        );

        for vuln in landscape.vulnerabilities.iter().take(MAX_VULNERABILITIES) {
            if let Some(assessment) = self.assess(vuln, &context).await {
                assessments.push(assessment);
            }
        }
        for indicator in landscape.indicators.iter().take(MAX_INDICATORS) {
            if let Some(assessment) = self.assess(indicator, &context).await {
                assessments.push(assessment);
            }
        }

        assessments.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        tracing::info!(count = assessments.len(), "risk assessments generated");
        assessments
    }

    async fn assess(
        &self,
        threat: &ThreatItem,
        context: &OrganizationContext,
    ) -> Option<RiskAssessment> {
        let prompt = build_prompt(threat, context);

        let reply = match self.llm.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(threat = %threat.name, error = %e, "assessment call failed");
                return None;
            }
        };

        let parsed: ModelAssessment = match recover_json(&reply)
            .and_then(|v| serde_json::from_value(v).ok())
        {
            Some(parsed) => parsed,
            None => {
                tracing::debug!(threat = %threat.name, "assessment reply not parseable");
                return None;
            }
        };

        Some(RiskAssessment {
            threat_id: threat.name.clone(),
            threat_type: threat.kind.as_str().to_string(),
            risk_score: parsed.risk_score,
            affected_assets: parsed.affected_assets,
            business_impact: parsed.business_impact,
            reasoning: parsed.reasoning,
            original_severity: threat.severity.clone(),
        })
    }
}

fn build_prompt(threat: &ThreatItem, context: &OrganizationContext) -> String {
    let tech_list = context.top_technologies(5);
    let geo_list = context.geographic_presence.join(", ");
    let description = truncate_chars(&threat.description, DESCRIPTION_BUDGET);

    let mut prompt = format!(
        "Analyze this threat against our organizational context.\n\n\
         Threat: {}\nType: {}\nDescription: {}\n",
        threat.name,
        threat.kind.as_str(),
        description,
    );
    if let Some(severity) = &threat.severity {
        prompt.push_str(&format!("Severity: {severity}\n"));
    }
    if let Some(score) = threat.cvss_score {
        prompt.push_str(&format!("CVSS Score: {score}\n"));
    }
    if let Some(pattern) = &threat.pattern {
        prompt.push_str(&format!(
            "Pattern: {}\n",
            truncate_chars(pattern, PATTERN_BUDGET)
        ));
    }

    prompt.push_str(&format!(
        "\nOur organization:\nTechnologies: {tech_list}\nLocations: {geo_list}\n\n\
         Provide a JSON response with:\n\
         1. \"affected_assets\": list of our technologies/systems that could be affected\n\
         2. \"business_impact\": brief description of potential business impact\n\
         3. \"risk_score\": number 1-10 based on relevance to our organization\n\
         4. \"reasoning\": one sentence explanation\n\n\
         If this threat is not relevant to our organization, return a risk_score of 0.\n\
         Respond with valid JSON only.\n"
    ));
    prompt
}

/// Deterministic executive summary over the ranked assessments.
pub fn executive_summary(assessments: &[RiskAssessment]) -> String {
    if assessments.is_empty() {
        return "No significant risks identified based on current threat landscape.".to_string();
    }

    let high = assessments.iter().filter(|r| r.risk_score >= 7.0).count();
    let medium = assessments
        .iter()
        .filter(|r| r.risk_score >= 4.0 && r.risk_score < 7.0)
        .count();

    let mut summary = format!(
        "RISK ASSESSMENT SUMMARY\n=======================\n\
         Total Threats Analyzed: {}\nHigh Risk: {}\nMedium Risk: {}\n\nTOP RISKS:\n",
        assessments.len(),
        high,
        medium
    );

    for risk in assessments.iter().take(3) {
        summary.push_str(&format!(
            "- {} (Score: {}/10)\n  Impact: {}\n  Affected: {}\n",
            risk.threat_id,
            risk.risk_score,
            risk.business_impact,
            risk.affected_assets.join(", ")
        ));
    }

    summary
}
