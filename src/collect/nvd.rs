//! NVD vulnerability feed agent
//!
//! Queries the NVD CVE API 2.0 for vulnerabilities published in the last
//! 30 days. The window bounds feed volume and keeps the relevance signal
//! fresh. Severity and score come from whichever CVSS metric version the
//! record supplies, newest first: v3.1, then v3.0, then v2.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::{CollectError, CollectionAgent, RawBatch};
use crate::keywords::KeywordSet;
use crate::models::{ThreatItem, ThreatKind};

const NVD_API_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";
const WINDOW_DAYS: i64 = 30;
const RESULTS_PER_PAGE: u32 = 100;

pub struct NvdAgent {
    client: reqwest::Client,
    api_key: Option<String>,
    keywords: KeywordSet,
    base_url: String,
}

impl NvdAgent {
    pub fn new(client: reqwest::Client, api_key: Option<String>, keywords: KeywordSet) -> Self {
        Self {
            client,
            api_key,
            keywords,
            base_url: NVD_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NvdRecord {
    cve: NvdCve,
}

#[derive(Debug, Deserialize)]
struct NvdCve {
    id: String,
    #[serde(default)]
    descriptions: Vec<NvdDescription>,
    #[serde(default)]
    metrics: NvdMetrics,
}

#[derive(Debug, Deserialize)]
struct NvdDescription {
    lang: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct NvdMetrics {
    #[serde(rename = "cvssMetricV31", default)]
    v31: Vec<NvdCvssMetricV3>,
    #[serde(rename = "cvssMetricV30", default)]
    v30: Vec<NvdCvssMetricV3>,
    #[serde(rename = "cvssMetricV2", default)]
    v2: Vec<NvdCvssMetricV2>,
}

#[derive(Debug, Deserialize)]
struct NvdCvssMetricV3 {
    #[serde(rename = "cvssData")]
    cvss_data: NvdCvssDataV3,
}

#[derive(Debug, Deserialize)]
struct NvdCvssDataV3 {
    #[serde(rename = "baseScore")]
    base_score: f64,
    #[serde(rename = "baseSeverity")]
    base_severity: String,
}

#[derive(Debug, Deserialize)]
struct NvdCvssMetricV2 {
    #[serde(rename = "cvssData")]
    cvss_data: NvdCvssDataV2,
    #[serde(rename = "baseSeverity", default)]
    base_severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NvdCvssDataV2 {
    #[serde(rename = "baseScore")]
    base_score: f64,
}

impl NvdMetrics {
    /// Pinned priority order: v3.1 over v3.0 over v2.
    fn severity_and_score(&self) -> (Option<String>, Option<f64>) {
        if let Some(m) = self.v31.first() {
            return (
                Some(m.cvss_data.base_severity.clone()),
                Some(m.cvss_data.base_score),
            );
        }
        if let Some(m) = self.v30.first() {
            return (
                Some(m.cvss_data.base_severity.clone()),
                Some(m.cvss_data.base_score),
            );
        }
        if let Some(m) = self.v2.first() {
            return (m.base_severity.clone(), Some(m.cvss_data.base_score));
        }
        (None, None)
    }
}

impl NvdCve {
    fn english_description(&self) -> &str {
        self.descriptions
            .iter()
            .find(|d| d.lang == "en")
            .map(|d| d.value.as_str())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CollectionAgent for NvdAgent {
    fn name(&self) -> &'static str {
        "nvd"
    }

    async fn collect(&self) -> Result<RawBatch, CollectError> {
        let end = Utc::now();
        let start = end - Duration::days(WINDOW_DAYS);
        let fmt = "%Y-%m-%dT%H:%M:%S%.3f";

        let mut request = self.client.get(&self.base_url).query(&[
            ("pubStartDate", start.format(fmt).to_string()),
            ("pubEndDate", end.format(fmt).to_string()),
            ("resultsPerPage", RESULTS_PER_PAGE.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("apiKey", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(CollectError::Status(response.status().as_u16()));
        }

        let mut body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CollectError::Decode(e.to_string()))?;

        match body.get_mut("vulnerabilities").map(serde_json::Value::take) {
            Some(serde_json::Value::Array(records)) => Ok(records),
            _ => Ok(Vec::new()),
        }
    }

    fn process(&self, raw: RawBatch) -> Vec<ThreatItem> {
        let mut items = Vec::new();

        for record in raw {
            let record: NvdRecord = match serde_json::from_value(record) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(source = self.name(), error = %e, "skipping malformed record");
                    continue;
                }
            };

            let description = record.cve.english_description().to_string();
            let search_text = format!("{} {}", record.cve.id, description);
            if !self.keywords.matches(&search_text) {
                continue;
            }

            let (severity, score) = record.cve.metrics.severity_and_score();
            items.push(ThreatItem {
                kind: ThreatKind::Vulnerability,
                name: record.cve.id.clone(),
                id: Some(record.cve.id),
                description,
                pattern: None,
                severity,
                cvss_score: score,
                affected_components: vec![],
                value_type: None,
                source: Some(self.name().to_string()),
            });
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agent(keywords: &[&str]) -> NvdAgent {
        NvdAgent::new(
            reqwest::Client::new(),
            None,
            KeywordSet::from_terms(keywords.iter().copied()),
        )
    }

    fn record(id: &str, description: &str, metrics: serde_json::Value) -> serde_json::Value {
        json!({
            "cve": {
                "id": id,
                "descriptions": [
                    {"lang": "en", "value": description},
                    {"lang": "es", "value": "descripción"}
                ],
                "metrics": metrics
            }
        })
    }

    #[test]
    fn keyword_filter_keeps_only_matching_records() {
        let agent = agent(&["aws", "kubernetes"]);
        let raw = vec![
            record(
                "CVE-2024-0001",
                "Remote code execution in AWS Lambda layers",
                json!({}),
            ),
            record("CVE-2024-0002", "Overflow in unrelated product X", json!({})),
        ];

        let items = agent.process(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("CVE-2024-0001"));
        assert_eq!(items[0].kind, ThreatKind::Vulnerability);
    }

    #[test]
    fn cve_id_itself_is_searchable() {
        let agent = agent(&["cve-2024-9999"]);
        let raw = vec![record("CVE-2024-9999", "no keyword in prose", json!({}))];
        assert_eq!(agent.process(raw).len(), 1);
    }

    #[test]
    fn cvss_v31_wins_when_all_versions_present() {
        let agent = agent(&["kernel"]);
        let raw = vec![record(
            "CVE-2024-0010",
            "kernel memory corruption",
            json!({
                "cvssMetricV31": [{"cvssData": {"baseScore": 9.8, "baseSeverity": "CRITICAL"}}],
                "cvssMetricV30": [{"cvssData": {"baseScore": 8.1, "baseSeverity": "HIGH"}}],
                "cvssMetricV2": [{"cvssData": {"baseScore": 7.5}, "baseSeverity": "HIGH"}]
            }),
        )];

        let items = agent.process(raw);
        assert_eq!(items[0].cvss_score, Some(9.8));
        assert_eq!(items[0].severity.as_deref(), Some("CRITICAL"));
    }

    #[test]
    fn cvss_v30_wins_over_v2() {
        let agent = agent(&["kernel"]);
        let raw = vec![record(
            "CVE-2024-0011",
            "kernel race condition",
            json!({
                "cvssMetricV30": [{"cvssData": {"baseScore": 8.1, "baseSeverity": "HIGH"}}],
                "cvssMetricV2": [{"cvssData": {"baseScore": 7.5}, "baseSeverity": "HIGH"}]
            }),
        )];

        assert_eq!(agent.process(raw)[0].cvss_score, Some(8.1));
    }

    #[test]
    fn cvss_v2_is_last_resort() {
        let agent = agent(&["kernel"]);
        let raw = vec![record(
            "CVE-2014-0012",
            "legacy kernel flaw",
            json!({
                "cvssMetricV2": [{"cvssData": {"baseScore": 6.8}, "baseSeverity": "MEDIUM"}]
            }),
        )];

        let items = agent.process(raw);
        assert_eq!(items[0].cvss_score, Some(6.8));
        assert_eq!(items[0].severity.as_deref(), Some("MEDIUM"));
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let agent = agent(&["aws"]);
        let raw = vec![
            json!({"cve": "not an object"}),
            record("CVE-2024-0001", "AWS credential leak", json!({})),
        ];

        let items = agent.process(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("CVE-2024-0001"));
    }
}
