//! AlienVault OTX pulse feed agent
//!
//! A pulse bundles a name and description with a batch of raw indicator
//! entries of heterogeneous type. When the pulse text matches the keyword
//! set, every contained indicator converts individually into a threat
//! item; one bad indicator must not lose its siblings.

use async_trait::async_trait;
use serde::Deserialize;

use super::{CollectError, CollectionAgent, RawBatch};
use crate::keywords::KeywordSet;
use crate::models::{ThreatItem, ThreatKind};

const OTX_PULSES_URL: &str = "https://otx.alienvault.com/api/v1/pulses/subscribed";
const PULSE_LIMIT: u32 = 50;

/// Fallback STIX value type for indicator types absent from the mapping
/// table. Unrecognized entries are tagged, never dropped.
const GENERIC_VALUE_TYPE: &str = "artifact";

pub struct OtxAgent {
    client: reqwest::Client,
    api_key: String,
    keywords: KeywordSet,
    base_url: String,
}

impl OtxAgent {
    pub fn new(client: reqwest::Client, api_key: String, keywords: KeywordSet) -> Self {
        Self {
            client,
            api_key,
            keywords,
            base_url: OTX_PULSES_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Pulse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    indicators: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PulseIndicator {
    indicator: String,
    #[serde(rename = "type")]
    indicator_type: String,
}

/// Map an OTX indicator type to a normalized STIX value type.
fn stix_value_type(otx_type: &str) -> &'static str {
    match otx_type {
        "IPv4" => "ipv4-addr",
        "IPv6" => "ipv6-addr",
        "domain" => "domain-name",
        "hostname" => "domain-name",
        "URL" => "url",
        "URI" => "url",
        "FileHash-MD5" => "file:hashes.MD5",
        "FileHash-SHA1" => "file:hashes.'SHA-1'",
        "FileHash-SHA256" => "file:hashes.'SHA-256'",
        "email" => "email-addr",
        _ => GENERIC_VALUE_TYPE,
    }
}

/// Double embedded single quotes so one corrupt value cannot break the
/// pattern encoding of the whole pulse.
fn escape_value(value: &str) -> String {
    value.replace('\'', "''")
}

#[async_trait]
impl CollectionAgent for OtxAgent {
    fn name(&self) -> &'static str {
        "otx"
    }

    async fn collect(&self) -> Result<RawBatch, CollectError> {
        let response = self
            .client
            .get(&self.base_url)
            .header("X-OTX-API-KEY", &self.api_key)
            .query(&[("limit", PULSE_LIMIT.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollectError::Status(response.status().as_u16()));
        }

        let mut body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CollectError::Decode(e.to_string()))?;

        match body.get_mut("results").map(serde_json::Value::take) {
            Some(serde_json::Value::Array(pulses)) => Ok(pulses),
            _ => Ok(Vec::new()),
        }
    }

    fn process(&self, raw: RawBatch) -> Vec<ThreatItem> {
        let mut items = Vec::new();

        for record in raw {
            let pulse: Pulse = match serde_json::from_value(record) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(source = self.name(), error = %e, "skipping malformed pulse");
                    continue;
                }
            };

            let pulse_text = format!("{} {}", pulse.name, pulse.description);
            if !self.keywords.matches(&pulse_text) {
                continue;
            }

            // Per-indicator try/skip: siblings survive a bad entry.
            for entry in pulse.indicators {
                let indicator: PulseIndicator = match serde_json::from_value(entry) {
                    Ok(i) => i,
                    Err(e) => {
                        tracing::warn!(
                            source = self.name(),
                            pulse = %pulse.name,
                            error = %e,
                            "skipping malformed indicator entry"
                        );
                        continue;
                    }
                };

                let value_type = stix_value_type(&indicator.indicator_type);
                let pattern = format!(
                    "[{}:value = '{}']",
                    value_type,
                    escape_value(&indicator.indicator)
                );

                items.push(ThreatItem {
                    kind: ThreatKind::Indicator,
                    name: pulse.name.clone(),
                    id: None,
                    description: pulse.description.clone(),
                    pattern: Some(pattern),
                    severity: None,
                    cvss_score: None,
                    affected_components: vec![],
                    value_type: Some(value_type.to_string()),
                    source: Some(self.name().to_string()),
                });
            }
        }

        items
    }
}
