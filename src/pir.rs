//! PIR generation
//!
//! Queries the organizational graph for context, asks the language model
//! for Priority Intelligence Requirements, then derives the keyword set
//! that links PIR output to collection. Keyword derivation never blocks a
//! run: any failure degrades to the generic fallback set.

use std::sync::Arc;

use serde::Serialize;

use crate::graph::GraphStore;
use crate::keywords::KeywordSet;
use crate::llm::{LanguageModel, LlmError};
use crate::models::OrganizationContext;

const PIR_PROMPT_HEADER: &str = r#"
You are a threat intelligence analyst. Based on the organizational context
below, generate 3-5 Priority Intelligence Requirements (PIRs): concise,
actionable statements of what threat information matters most to this
organization. Tie each PIR to a concrete business initiative, technology,
or geography. Prioritize PIRs that would prevent breaches.
"#;

const KEYWORD_PROMPT_HEADER: &str = r#"
From the following threat intelligence requirements, extract no more than
10 critical, specific, and searchable keywords. Focus on technologies,
threat actor types, regions, and targeted assets. Return the keywords as a
single comma-separated string and nothing else.

Requirements:
"#;

#[derive(Debug, Clone, Serialize)]
pub struct PirReport {
    pub pirs: String,
    pub keywords: Vec<String>,
    #[serde(skip)]
    pub keyword_set: KeywordSet,
}

pub struct PirGenerator {
    llm: Arc<dyn LanguageModel>,
    graph: Arc<dyn GraphStore>,
}

impl PirGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, graph: Arc<dyn GraphStore>) -> Self {
        Self { llm, graph }
    }

    /// Generate PIR prose and the keyword set derived from it. PIR
    /// generation failure surfaces (there is nothing to collect against);
    /// keyword extraction failure degrades to the fallback set.
    pub async fn generate(&self) -> Result<PirReport, LlmError> {
        let context = self
            .graph
            .context_summary()
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "graph context unavailable, generating from empty context");
                OrganizationContext::default()
            });

        if context.is_empty() {
            tracing::warn!("organizational graph is empty; PIRs will be generic");
        }

        let prompt = format!(
            "{PIR_PROMPT_HEADER}\nOrganizational context:\n{}",
            render_context(&context)
        );
        let pirs = self.llm.complete(&prompt).await?;
        tracing::info!("PIR generation complete");

        let keyword_set = self.derive_keywords(&pirs).await;
        Ok(PirReport {
            pirs,
            keywords: keyword_set.to_vec(),
            keyword_set,
        })
    }

    /// Extract searchable keywords from PIR prose. Never fails.
    pub async fn derive_keywords(&self, pirs_text: &str) -> KeywordSet {
        if pirs_text.trim().is_empty() {
            return KeywordSet::fallback();
        }

        let prompt = format!("{KEYWORD_PROMPT_HEADER}\"{pirs_text}\"\n\nKeywords:");
        match self.llm.complete(&prompt).await {
            Ok(reply) => {
                let set = KeywordSet::from_comma_list(&reply);
                tracing::debug!(keywords = ?set.to_vec(), "keywords extracted from PIRs");
                set
            }
            Err(e) => {
                tracing::warn!(error = %e, "keyword extraction failed, using fallback set");
                KeywordSet::fallback()
            }
        }
    }
}

fn render_context(context: &OrganizationContext) -> String {
    let mut out = String::new();
    if !context.technologies.is_empty() {
        out.push_str(&format!(
            "Technologies: {}\n",
            context.top_technologies(20)
        ));
    }
    if !context.business_initiatives.is_empty() {
        let names: Vec<_> = context
            .business_initiatives
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        out.push_str(&format!("Business initiatives: {}\n", names.join(", ")));
    }
    if !context.geographic_presence.is_empty() {
        out.push_str(&format!(
            "Geographic presence: {}\n",
            context.geographic_presence.join(", ")
        ));
    }
    if !context.critical_assets.is_empty() {
        let names: Vec<_> = context
            .critical_assets
            .iter()
            .map(|e| format!("{} ({})", e.name, e.entity_type))
            .collect();
        out.push_str(&format!("Critical assets: {}\n", names.join(", ")));
    }
    if out.is_empty() {
        out.push_str("(no organizational data available)\n");
    }
    out
}
