//! Risk assessment and threat model shapes

use serde::{Deserialize, Serialize};

/// One correlated risk, produced by the correlation stage.
///
/// `risk_score` follows a 0-10 convention where 0 means "not relevant to
/// this organization" or "assessment failed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub threat_id: String,
    pub threat_type: String,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub affected_assets: Vec<String>,
    #[serde(default)]
    pub business_impact: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_severity: Option<String>,
}

/// Attack-path threat model produced by the threat modeling stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreatModel {
    #[serde(default)]
    pub attack_paths: Vec<AttackPath>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackPath {
    pub path_description: String,
    #[serde(default)]
    pub steps: Vec<AttackStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackStep {
    pub step: u32,
    pub action: String,
    #[serde(default)]
    pub mitre_attack: String,
    #[serde(default)]
    pub stride_classification: String,
    #[serde(default)]
    pub justification: String,
}
