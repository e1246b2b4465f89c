//! Organizational DNA ingestion
//!
//! Stage 1: pull typed entities and relationships out of document text via
//! the language model and upsert them into the knowledge graph. Document
//! text arrives through the API already extracted; no file parsing here.

use std::sync::Arc;

use serde::Deserialize;

use crate::graph::{GraphError, GraphStore};
use crate::llm::{recover_json, LanguageModel};
use crate::models::{Entity, Relationship};

const EXTRACTION_PROMPT: &str = r#"
You are building an organizational knowledge graph for threat intelligence.
Extract entities and relationships from the document below.

Entity types: technology, business_initiative, geography, system,
application, database, threat_actor, organization.

Respond with valid JSON only, in this shape:
{
  "entities": [
    {"id": "kebab-case-id", "name": "...", "type": "...",
     "description": "...", "importance": 0.0}
  ],
  "relationships": [
    {"source": "entity-id", "target": "entity-id", "type": "USES_TECHNOLOGY"}
  ]
}

Document:
"#;

#[derive(Debug, Default, Deserialize)]
struct Extraction {
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestReport {
    pub entities_added: usize,
    pub relationships_added: usize,
}

pub struct DnaBuilder {
    llm: Arc<dyn LanguageModel>,
    graph: Arc<dyn GraphStore>,
}

impl DnaBuilder {
    pub fn new(llm: Arc<dyn LanguageModel>, graph: Arc<dyn GraphStore>) -> Self {
        Self { llm, graph }
    }

    /// Extract entities from one document and upsert them into the graph.
    /// A failed or malformed extraction degrades to an empty one; only a
    /// graph write failure surfaces.
    pub async fn ingest_document(
        &self,
        document_name: &str,
        text: &str,
    ) -> Result<IngestReport, GraphError> {
        let extraction = self.extract(text).await;
        let mut report = IngestReport {
            entities_added: 0,
            relationships_added: 0,
        };

        for mut entity in extraction.entities {
            entity.source_document = Some(document_name.to_string());
            self.graph.upsert_entity(entity).await?;
            report.entities_added += 1;
        }
        for rel in extraction.relationships {
            self.graph.upsert_relationship(rel).await?;
            report.relationships_added += 1;
        }

        tracing::info!(
            document = document_name,
            entities = report.entities_added,
            relationships = report.relationships_added,
            "document ingested into organizational DNA"
        );
        Ok(report)
    }

    async fn extract(&self, text: &str) -> Extraction {
        let prompt = format!("{EXTRACTION_PROMPT}{text}");
        let reply = match self.llm.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "entity extraction call failed");
                return Extraction::default();
            }
        };

        match recover_json(&reply).and_then(|v| serde_json::from_value(v).ok()) {
            Some(extraction) => extraction,
            None => {
                tracing::warn!("entity extraction returned unusable JSON");
                Extraction::default()
            }
        }
    }
}
