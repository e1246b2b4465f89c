//! End-to-end pipeline orchestration
//!
//! Runs the stages in order with direct data passing: PIRs from the graph,
//! keywords from the PIRs, collection filtered by keywords, correlation
//! over the landscape, then the attack-path threat model over the whole
//! package. All collaborators are injected; the pipeline owns no globals.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;

use crate::collect::{
    CollectionAgent, GithubAdvisoryAgent, NvdAgent, OtxAgent, ThreatLandscapeBuilder,
};
use crate::config::Config;
use crate::correlate::{executive_summary, Correlator};
use crate::graph::GraphStore;
use crate::keywords::KeywordSet;
use crate::llm::{LanguageModel, LlmError};
use crate::models::{RiskAssessment, ThreatLandscape, ThreatModel};
use crate::pir::PirGenerator;
use crate::threat_model;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub pirs: String,
    pub keywords: Vec<String>,
    pub threat_landscape: ThreatLandscape,
    pub risk_assessments: Vec<RiskAssessment>,
    pub executive_summary: String,
    pub threat_model: ThreatModel,
}

pub struct Pipeline {
    config: Config,
    http: reqwest::Client,
    llm: Arc<dyn LanguageModel>,
    graph: Arc<dyn GraphStore>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        http: reqwest::Client,
        llm: Arc<dyn LanguageModel>,
        graph: Arc<dyn GraphStore>,
    ) -> Self {
        Self {
            config,
            http,
            llm,
            graph,
        }
    }

    /// Build the agent list for one run. A source whose credentials are
    /// absent is simply omitted; that is configuration, not an error.
    pub fn build_agents(&self, keywords: &KeywordSet) -> Vec<Box<dyn CollectionAgent>> {
        let mut agents: Vec<Box<dyn CollectionAgent>> = Vec::new();

        agents.push(Box::new(NvdAgent::new(
            self.http.clone(),
            self.config.nvd_api_key.clone(),
            keywords.clone(),
        )));

        if let Some(token) = &self.config.github_token {
            agents.push(Box::new(GithubAdvisoryAgent::new(
                self.http.clone(),
                token.clone(),
                keywords.clone(),
            )));
        } else {
            tracing::debug!("GITHUB_TOKEN absent, advisory source omitted");
        }

        if let Some(key) = &self.config.otx_api_key {
            agents.push(Box::new(OtxAgent::new(
                self.http.clone(),
                key.clone(),
                keywords.clone(),
            )));
        } else {
            tracing::debug!("OTX_API_KEY absent, pulse source omitted");
        }

        agents
    }

    /// Collection stage on its own: keywords in, landscape out. Always
    /// returns a landscape, possibly sparse.
    pub async fn collect(&self, keywords: KeywordSet) -> ThreatLandscape {
        let agents = self.build_agents(&keywords);
        ThreatLandscapeBuilder::new(agents, keywords)
            .with_source_deadline(self.config.source_deadline)
            .build()
            .await
    }

    /// Full pipeline run.
    pub async fn run(&self) -> Result<PipelineReport, LlmError> {
        let started = Instant::now();
        tracing::info!("starting pipeline execution");

        let pir_generator = PirGenerator::new(self.llm.clone(), self.graph.clone());
        let pir_report = pir_generator.generate().await?;

        let landscape = self.collect(pir_report.keyword_set.clone()).await;
        tracing::info!(
            total_items = landscape.total_items,
            vulnerabilities = landscape.vulnerabilities.len(),
            indicators = landscape.indicators.len(),
            "collection stage complete"
        );

        let correlator = Correlator::new(self.llm.clone(), self.graph.clone());
        let assessments = correlator.correlate(&landscape).await;
        let summary = executive_summary(&assessments);

        let intelligence = json!({
            "pirs": pir_report.pirs,
            "keywords": pir_report.keywords,
            "threat_landscape": landscape,
            "risk_assessments": assessments,
            "executive_summary": summary,
        });
        let model = threat_model::generate(self.llm.as_ref(), &intelligence).await;

        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            "pipeline completed"
        );

        Ok(PipelineReport {
            pirs: pir_report.pirs,
            keywords: pir_report.keywords,
            threat_landscape: landscape,
            risk_assessments: assessments,
            executive_summary: summary,
            threat_model: model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::llm::testing::StaticModel;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            port: 0,
            openai_api_key: String::new(),
            openai_model: "test".into(),
            openai_base_url: None,
            nvd_api_key: None,
            github_token: None,
            otx_api_key: None,
            http_timeout: Duration::from_secs(1),
            source_deadline: Duration::from_secs(1),
        }
    }

    #[test]
    fn agents_without_credentials_are_omitted() {
        let pipeline = Pipeline::new(
            config(),
            reqwest::Client::new(),
            Arc::new(StaticModel::new(["x"])),
            Arc::new(MemoryGraph::new()),
        );
        // NVD works unauthenticated; GitHub and OTX require credentials.
        let agents = pipeline.build_agents(&KeywordSet::fallback());
        let names: Vec<_> = agents.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["nvd"]);
    }

    #[test]
    fn all_sources_enabled_with_full_credentials() {
        let mut cfg = config();
        cfg.github_token = Some("tok".into());
        cfg.otx_api_key = Some("key".into());
        let pipeline = Pipeline::new(
            cfg,
            reqwest::Client::new(),
            Arc::new(StaticModel::new(["x"])),
            Arc::new(MemoryGraph::new()),
        );

        let names: Vec<_> = pipeline
            .build_agents(&KeywordSet::fallback())
            .iter()
            .map(|a| a.name())
            .collect();
        assert_eq!(names, vec!["nvd", "github", "otx"]);
    }
}
