//! Knowledge graph API client methods

use super::{ApiClient, child_path, project_path};
use crate::dispatcher::RequestDescriptor;
use crate::error::Result;
use crate::query::encode_query;
use crate::types::{
    EntityListQuery, GraphEntityDetail, GraphEntityList, GraphRelation, RelationListQuery,
    Subgraph, SubgraphQuery,
};

fn graph_path(slug: &str) -> String {
    format!("{}/graph", project_path(slug))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn graph_entities(
        &self,
        slug: &str,
        query: &EntityListQuery,
    ) -> Result<GraphEntityList> {
        let path = format!("{}/entities{}", graph_path(slug), encode_query(query)?);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// Entity with its direct relations
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no entity has that name
    pub async fn graph_entity(&self, slug: &str, name: &str) -> Result<GraphEntityDetail> {
        let path = child_path(&format!("{}/entities", graph_path(slug)), name);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn delete_graph_entity(&self, slug: &str, name: &str) -> Result<()> {
        let path = child_path(&format!("{}/entities", graph_path(slug)), name);
        self.dispatcher
            .request_json(&RequestDescriptor::delete(path))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn graph_relations(
        &self,
        slug: &str,
        query: &RelationListQuery,
    ) -> Result<Vec<GraphRelation>> {
        let path = format!("{}/relations{}", graph_path(slug), encode_query(query)?);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn delete_graph_relation(&self, slug: &str, relation_id: &str) -> Result<()> {
        let path = child_path(&format!("{}/relations", graph_path(slug)), relation_id);
        self.dispatcher
            .request_json(&RequestDescriptor::delete(path))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure; the backend answers 422 when no
    /// entity is given
    pub async fn subgraph(&self, slug: &str, query: &SubgraphQuery) -> Result<Subgraph> {
        let path = format!("{}/subgraph{}", graph_path(slug), encode_query(query)?);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }
}
