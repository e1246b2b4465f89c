//! Organizational knowledge graph collaborator
//!
//! The graph database is an external collaborator with a simple upsert
//! contract plus the handful of read queries the PIR and correlation
//! stages need. `MemoryGraph` is the in-process implementation used by the
//! server and tests; a real graph backend stays behind the trait.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Entity, OrganizationContext, Relationship};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert or update an entity by id.
    async fn upsert_entity(&self, entity: Entity) -> Result<(), GraphError>;

    /// Insert a relationship; duplicates are tolerated.
    async fn upsert_relationship(&self, rel: Relationship) -> Result<(), GraphError>;

    async fn entity_count(&self) -> Result<usize, GraphError>;

    /// Entities of one type, sorted by importance descending.
    async fn entities_by_type(
        &self,
        entity_type: &str,
        limit: usize,
    ) -> Result<Vec<Entity>, GraphError>;

    /// Case-insensitive substring search over names and descriptions.
    async fn search_entities(&self, keyword: &str, limit: usize)
        -> Result<Vec<Entity>, GraphError>;

    /// The context slice used for PIR generation and correlation prompts.
    async fn context_summary(&self) -> Result<OrganizationContext, GraphError>;
}

#[derive(Default)]
struct GraphInner {
    entities: HashMap<String, Entity>,
    relationships: Vec<Relationship>,
}

/// In-memory graph store. Read-mostly after DNA ingestion, so an async
/// RwLock is sufficient.
#[derive(Default)]
pub struct MemoryGraph {
    inner: RwLock<GraphInner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_by_importance(mut entities: Vec<Entity>) -> Vec<Entity> {
        entities.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        entities
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn upsert_entity(&self, entity: Entity) -> Result<(), GraphError> {
        self.inner
            .write()
            .await
            .entities
            .insert(entity.id.clone(), entity);
        Ok(())
    }

    async fn upsert_relationship(&self, rel: Relationship) -> Result<(), GraphError> {
        let mut inner = self.inner.write().await;
        let exists = inner
            .relationships
            .iter()
            .any(|r| r.source == rel.source && r.target == rel.target && r.rel_type == rel.rel_type);
        if !exists {
            inner.relationships.push(rel);
        }
        Ok(())
    }

    async fn entity_count(&self) -> Result<usize, GraphError> {
        Ok(self.inner.read().await.entities.len())
    }

    async fn entities_by_type(
        &self,
        entity_type: &str,
        limit: usize,
    ) -> Result<Vec<Entity>, GraphError> {
        let inner = self.inner.read().await;
        let matched: Vec<Entity> = inner
            .entities
            .values()
            .filter(|e| e.entity_type == entity_type)
            .cloned()
            .collect();
        Ok(Self::sorted_by_importance(matched)
            .into_iter()
            .take(limit)
            .collect())
    }

    async fn search_entities(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<Entity>, GraphError> {
        let keyword = keyword.to_lowercase();
        let inner = self.inner.read().await;
        let matched: Vec<Entity> = inner
            .entities
            .values()
            .filter(|e| {
                e.name.to_lowercase().contains(&keyword)
                    || e.description.to_lowercase().contains(&keyword)
            })
            .cloned()
            .collect();
        Ok(Self::sorted_by_importance(matched)
            .into_iter()
            .take(limit)
            .collect())
    }

    async fn context_summary(&self) -> Result<OrganizationContext, GraphError> {
        let technologies = self.entities_by_type("technology", 20).await?;
        let business_initiatives = self.entities_by_type("business_initiative", 10).await?;
        let geographic_presence = self
            .entities_by_type("geography", 10)
            .await?
            .into_iter()
            .map(|e| e.name)
            .collect();

        let inner = self.inner.read().await;
        let assets: Vec<Entity> = inner
            .entities
            .values()
            .filter(|e| {
                e.importance > 0.7
                    || matches!(e.entity_type.as_str(), "system" | "application" | "database")
            })
            .cloned()
            .collect();
        let critical_assets = Self::sorted_by_importance(assets)
            .into_iter()
            .take(10)
            .collect();

        Ok(OrganizationContext {
            technologies,
            business_initiatives,
            geographic_presence,
            critical_assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, name: &str, entity_type: &str, importance: f64) -> Entity {
        Entity {
            id: id.to_string(),
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            description: String::new(),
            importance,
            source_document: None,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let graph = MemoryGraph::new();
        graph
            .upsert_entity(entity("t1", "AWS", "technology", 0.5))
            .await
            .unwrap();
        graph
            .upsert_entity(entity("t1", "AWS EC2", "technology", 0.9))
            .await
            .unwrap();

        assert_eq!(graph.entity_count().await.unwrap(), 1);
        let techs = graph.entities_by_type("technology", 10).await.unwrap();
        assert_eq!(techs[0].name, "AWS EC2");
    }

    #[tokio::test]
    async fn entities_by_type_sorts_by_importance() {
        let graph = MemoryGraph::new();
        graph
            .upsert_entity(entity("t1", "Flask", "technology", 0.4))
            .await
            .unwrap();
        graph
            .upsert_entity(entity("t2", "Kubernetes", "technology", 0.9))
            .await
            .unwrap();

        let techs = graph.entities_by_type("technology", 10).await.unwrap();
        assert_eq!(techs[0].name, "Kubernetes");
        assert_eq!(techs[1].name, "Flask");
    }

    #[tokio::test]
    async fn context_summary_collects_all_sections() {
        let graph = MemoryGraph::new();
        graph
            .upsert_entity(entity("t1", "PostgreSQL", "technology", 0.8))
            .await
            .unwrap();
        graph
            .upsert_entity(entity("b1", "APAC Expansion", "business_initiative", 0.7))
            .await
            .unwrap();
        graph
            .upsert_entity(entity("g1", "Singapore", "geography", 0.6))
            .await
            .unwrap();
        graph
            .upsert_entity(entity("a1", "Payment API", "application", 0.3))
            .await
            .unwrap();

        let ctx = graph.context_summary().await.unwrap();
        assert_eq!(ctx.technologies.len(), 1);
        assert_eq!(ctx.business_initiatives.len(), 1);
        assert_eq!(ctx.geographic_presence, vec!["Singapore"]);
        // Applications count as critical assets regardless of importance;
        // the high-importance technology qualifies on importance alone.
        assert!(ctx.critical_assets.iter().any(|e| e.name == "Payment API"));
        assert!(ctx.critical_assets.iter().any(|e| e.name == "PostgreSQL"));
    }

    #[tokio::test]
    async fn search_matches_name_and_description() {
        let graph = MemoryGraph::new();
        let mut e = entity("t1", "Customer Database", "database", 0.9);
        e.description = "PostgreSQL cluster holding PII".to_string();
        graph.upsert_entity(e).await.unwrap();

        assert_eq!(graph.search_entities("customer", 5).await.unwrap().len(), 1);
        assert_eq!(graph.search_entities("postgresql", 5).await.unwrap().len(), 1);
        assert!(graph.search_entities("mongodb", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_relationships_are_collapsed() {
        let graph = MemoryGraph::new();
        let rel = Relationship {
            source: "org".into(),
            target: "t1".into(),
            rel_type: "USES_TECHNOLOGY".into(),
        };
        graph.upsert_relationship(rel.clone()).await.unwrap();
        graph.upsert_relationship(rel).await.unwrap();

        assert_eq!(graph.inner.read().await.relationships.len(), 1);
    }
}
