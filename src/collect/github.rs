//! GitHub Security Advisories agent
//!
//! Fetches the most recently published advisories over the GraphQL API.
//! The keyword search string is deliberately broader than the NVD agent's:
//! advisory relevance often hinges on the affected package name rather
//! than prose, so the identifier, summary, description, and the flattened
//! `ecosystem/name` component list all participate in matching.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{CollectError, CollectionAgent, RawBatch};
use crate::keywords::KeywordSet;
use crate::models::{ThreatItem, ThreatKind};

const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const PAGE_SIZE: u32 = 50;

const ADVISORY_QUERY: &str = r#"
query($first: Int!) {
  securityAdvisories(first: $first, orderBy: {field: PUBLISHED_AT, direction: DESC}) {
    nodes {
      ghsaId
      summary
      description
      severity
      cvss { score }
      vulnerabilities(first: 10) {
        nodes {
          package { ecosystem name }
        }
      }
    }
  }
}
"#;

pub struct GithubAdvisoryAgent {
    client: reqwest::Client,
    token: String,
    keywords: KeywordSet,
    endpoint: String,
}

impl GithubAdvisoryAgent {
    pub fn new(client: reqwest::Client, token: String, keywords: KeywordSet) -> Self {
        Self {
            client,
            token,
            keywords,
            endpoint: GITHUB_GRAPHQL_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Advisory {
    #[serde(rename = "ghsaId")]
    ghsa_id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    cvss: Option<Cvss>,
    #[serde(default)]
    vulnerabilities: VulnerabilityConnection,
}

#[derive(Debug, Deserialize)]
struct Cvss {
    score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct VulnerabilityConnection {
    #[serde(default)]
    nodes: Vec<VulnerabilityNode>,
}

#[derive(Debug, Deserialize)]
struct VulnerabilityNode {
    package: Option<Package>,
}

#[derive(Debug, Deserialize)]
struct Package {
    ecosystem: String,
    name: String,
}

impl Advisory {
    /// Walk the nested package structure and flatten to "ecosystem/name".
    fn affected_components(&self) -> Vec<String> {
        self.vulnerabilities
            .nodes
            .iter()
            .filter_map(|n| n.package.as_ref())
            .map(|p| format!("{}/{}", p.ecosystem.to_lowercase(), p.name))
            .collect()
    }
}

#[async_trait]
impl CollectionAgent for GithubAdvisoryAgent {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn collect(&self) -> Result<RawBatch, CollectError> {
        let body = json!({
            "query": ADVISORY_QUERY,
            "variables": { "first": PAGE_SIZE },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header("User-Agent", "threatscape")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollectError::Status(response.status().as_u16()));
        }

        let mut payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CollectError::Decode(e.to_string()))?;

        let nodes = payload
            .pointer_mut("/data/securityAdvisories/nodes")
            .map(serde_json::Value::take);
        match nodes {
            Some(serde_json::Value::Array(records)) => Ok(records),
            _ => Ok(Vec::new()),
        }
    }

    fn process(&self, raw: RawBatch) -> Vec<ThreatItem> {
        let mut items = Vec::new();

        for record in raw {
            let advisory: Advisory = match serde_json::from_value(record) {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!(source = self.name(), error = %e, "skipping malformed record");
                    continue;
                }
            };

            let components = advisory.affected_components();
            let search_text = format!(
                "{} {} {} {}",
                advisory.ghsa_id,
                advisory.summary,
                advisory.description,
                components.join(" ")
            );
            if !self.keywords.matches(&search_text) {
                continue;
            }

            let score = advisory
                .cvss
                .as_ref()
                .and_then(|c| c.score)
                .filter(|s| *s > 0.0);

            items.push(ThreatItem {
                kind: ThreatKind::Vulnerability,
                name: advisory.ghsa_id.clone(),
                id: Some(advisory.ghsa_id),
                description: if advisory.description.is_empty() {
                    advisory.summary
                } else {
                    advisory.description
                },
                pattern: None,
                severity: advisory.severity,
                cvss_score: score,
                affected_components: components,
                value_type: None,
                source: Some(self.name().to_string()),
            });
        }

        items
    }
}
