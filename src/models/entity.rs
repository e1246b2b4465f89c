//! Organizational DNA entity models

use serde::{Deserialize, Serialize};

/// One node in the organizational knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// Free-form type tag: "technology", "business_initiative",
    /// "geography", "system", "application", "database", "threat_actor", ...
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub description: String,
    /// Relative weight 0.0-1.0 used when ranking context for prompts.
    #[serde(default)]
    pub importance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,
}

/// Directed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

/// Slice of the graph handed to the correlation and PIR stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationContext {
    pub technologies: Vec<Entity>,
    pub business_initiatives: Vec<Entity>,
    pub geographic_presence: Vec<String>,
    pub critical_assets: Vec<Entity>,
}

impl OrganizationContext {
    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
            && self.business_initiatives.is_empty()
            && self.geographic_presence.is_empty()
            && self.critical_assets.is_empty()
    }

    /// Comma-joined names of the top `n` technologies, for prompt text.
    pub fn top_technologies(&self, n: usize) -> String {
        self.technologies
            .iter()
            .take(n)
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
