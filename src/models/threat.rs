//! Threat item and landscape models
//!
//! `ThreatItem` is the common shape every collection source maps into.
//! Source-specific fields ride along as `x_`-prefixed extensions and are
//! never required by the landscape builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Routing tag for a threat item. Anything the wire doesn't recognize
/// deserializes as `Indicator` rather than failing the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatKind {
    #[default]
    Indicator,
    Vulnerability,
}

impl<'de> Deserialize<'de> for ThreatKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "vulnerability" => ThreatKind::Vulnerability,
            _ => ThreatKind::Indicator,
        })
    }
}

impl ThreatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatKind::Indicator => "indicator",
            ThreatKind::Vulnerability => "vulnerability",
        }
    }
}

/// Common intermediate representation produced by every collection agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatItem {
    #[serde(rename = "type", default)]
    pub kind: ThreatKind,
    pub name: String,
    /// Stable identifier; takes priority over `name` for deduplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub description: String,
    /// STIX-style observable pattern (pulse indicators only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "x_severity", default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(rename = "x_cvss_score", default, skip_serializing_if = "Option::is_none")]
    pub cvss_score: Option<f64>,
    #[serde(
        rename = "x_affected_components",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub affected_components: Vec<String>,
    #[serde(rename = "x_value_type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(rename = "x_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ThreatItem {
    /// Deduplication key: `id` when present and non-empty, else `name`.
    /// Items with neither are treated as always unique by the builder.
    pub fn dedup_key(&self) -> Option<&str> {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => Some(id),
            _ if !self.name.is_empty() => Some(&self.name),
            _ => None,
        }
    }
}

/// Aggregate output of one collection run. Constructed fresh per run,
/// never mutated after being returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatLandscape {
    pub indicators: Vec<ThreatItem>,
    pub vulnerabilities: Vec<ThreatItem>,
    /// Names of the sources that completed successfully.
    pub sources: Vec<String>,
    /// Always `indicators.len() + vulnerabilities.len()` post-dedup.
    pub total_items: usize,
    pub timestamp: DateTime<Utc>,
    /// The keyword set used for this run, for record-keeping only.
    pub keywords: Vec<String>,
}

/// Truncate to at most `max` characters, respecting char boundaries.
/// Used to bound description text before it reaches an LLM prompt.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_tag_becomes_indicator() {
        let item: ThreatItem =
            serde_json::from_str(r#"{"type": "campaign", "name": "x"}"#).unwrap();
        assert_eq!(item.kind, ThreatKind::Indicator);
    }

    #[test]
    fn missing_type_tag_becomes_indicator() {
        let item: ThreatItem = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(item.kind, ThreatKind::Indicator);
    }

    #[test]
    fn vulnerability_tag_round_trips() {
        let item: ThreatItem =
            serde_json::from_str(r#"{"type": "vulnerability", "name": "CVE-2024-1"}"#).unwrap();
        assert_eq!(item.kind, ThreatKind::Vulnerability);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "vulnerability");
    }

    #[test]
    fn dedup_key_prefers_id_over_name() {
        let item = ThreatItem {
            kind: ThreatKind::Vulnerability,
            name: "friendly".into(),
            id: Some("CVE-2024-1".into()),
            description: String::new(),
            pattern: None,
            severity: None,
            cvss_score: None,
            affected_components: vec![],
            value_type: None,
            source: None,
        };
        assert_eq!(item.dedup_key(), Some("CVE-2024-1"));
    }

    #[test]
    fn dedup_key_falls_back_to_name_when_id_empty() {
        let item = ThreatItem {
            kind: ThreatKind::Indicator,
            name: "friendly".into(),
            id: Some(String::new()),
            description: String::new(),
            pattern: None,
            severity: None,
            cvss_score: None,
            affected_components: vec![],
            value_type: None,
            source: None,
        };
        assert_eq!(item.dedup_key(), Some("friendly"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 300), "short");
        assert_eq!(truncate_chars("", 10), "");
    }
}
