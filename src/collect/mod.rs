//! Threat collection
//!
//! Each collection agent wraps one upstream feed: it fetches a bounded
//! window of raw records, then filters and maps them into the common
//! `ThreatItem` shape using the shared keyword set. The landscape builder
//! runs a list of agents and merges their output with per-source failure
//! isolation.

mod builder;
mod github;
mod nvd;
mod otx;

pub use builder::ThreatLandscapeBuilder;
pub use github::GithubAdvisoryAgent;
pub use nvd::NvdAgent;
pub use otx::OtxAgent;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ThreatItem;

/// A batch of source-native records. Each agent owns the parsing of its
/// own raw shape inside `process` and must not leak it past that boundary.
pub type RawBatch = Vec<serde_json::Value>;

/// Failure kinds for a collection source. The builder logs these and
/// continues; they never abort a landscape build.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("response body not decodable: {0}")]
    Decode(String),
}

/// Capability contract shared by all collection agent variants.
#[async_trait]
pub trait CollectionAgent: Send + Sync {
    /// Stable source name, recorded in the landscape's `sources` list.
    fn name(&self) -> &'static str;

    /// Fetch a bounded window of raw records from the upstream source.
    async fn collect(&self) -> Result<RawBatch, CollectError>;

    /// Filter and map raw records into threat items. A record that cannot
    /// be mapped is skipped and logged; processing continues with the
    /// remaining records.
    fn process(&self, raw: RawBatch) -> Vec<ThreatItem>;

    /// Compose `collect` then `process`. An empty batch yields an empty
    /// list rather than an error.
    async fn run(&self) -> Result<Vec<ThreatItem>, CollectError> {
        let raw = self.collect().await?;
        if raw.is_empty() {
            tracing::info!(source = self.name(), "no new data collected");
            return Ok(Vec::new());
        }
        let items = self.process(raw);
        tracing::info!(
            source = self.name(),
            items = items.len(),
            "collected relevant intelligence items"
        );
        Ok(items)
    }
}
