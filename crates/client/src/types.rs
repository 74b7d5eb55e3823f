//! Request and response bodies exchanged with the backend API

use crate::token_store::TokenPair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Auth

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair as issued by login and refresh
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

impl From<TokenResponse> for TokenPair {
    fn from(tokens: TokenResponse) -> Self {
        Self::new(tokens.access_token, tokens.refresh_token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_superadmin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// Projects

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub qdrant_collection: String,
    pub neo4j_database: Option<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Caller's role within the project
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    pub items: Vec<Project>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Project members

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddMemberRequest<'a> {
    pub email: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateMemberRequest<'a> {
    pub role: &'a str,
}

// Project config

/// Per-project mem0 backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub llm_config: Value,
    pub embedder_config: Value,
    pub vector_store_config: Value,
    pub graph_store_config: Value,
    pub updated_at: DateTime<Utc>,
}

/// Config sections to write. With `PUT` unset sections are reset, with
/// `PATCH` they are left alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedder_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_store_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_store_config: Option<Value>,
}

// Memories

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    pub mem0_user_id: String,
    #[serde(default)]
    pub mem0_agent_id: Option<String>,
    #[serde(default)]
    pub mem0_run_id: Option<String>,
    #[serde(default, rename = "metadata_")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryList {
    pub items: Vec<Memory>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Filters for listing memories; unset fields are left out of the query
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryListQuery {
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddMemoryRequest {
    pub messages: Vec<Value>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateMemoryRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
}

impl SearchRequest {
    /// Search with the backend's default result limit
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            agent_id: None,
            limit: 10,
            filters: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub mem0_user_id: Option<String>,
    #[serde(default, rename = "metadata_")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHistoryEntry {
    pub id: String,
    pub content: String,
    #[serde(default, rename = "metadata_")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Selects memories to delete: explicit ids, every memory of one user, or both
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkDeleteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    Csv,
}

/// Downloaded memory export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryExport {
    pub format: ExportFormat,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

// Webhooks

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub url: String,
    pub events: Vec<String>,
    pub is_active: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub last_status_code: Option<u16>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateWebhookRequest {
    pub url: String,
    pub events: Vec<String>,
    pub is_active: bool,
}

impl CreateWebhookRequest {
    /// Active webhook for the given events
    pub fn new(url: impl Into<String>, events: Vec<String>) -> Self {
        Self {
            url: url.into(),
            events,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateWebhookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: String,
    pub event: String,
    pub payload: Value,
    pub status_code: Option<u16>,
    pub attempt_count: u32,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Knowledge graph

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntity {
    pub name: String,
    #[serde(default, rename = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub relation_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelation {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub properties: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntityDetail {
    pub name: String,
    #[serde(default, rename = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub relations: Vec<GraphRelation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntityList {
    pub items: Vec<GraphEntity>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    pub entities: Vec<GraphEntity>,
    pub relations: Vec<GraphRelation>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationListQuery {
    pub source: Option<String>,
    pub target: Option<String>,
    #[serde(rename = "type")]
    pub relation_type: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Neighbourhood of one or more entities, `hops` deep (1 to 3)
#[derive(Debug, Clone, Serialize)]
pub struct SubgraphQuery {
    pub entities: Vec<String>,
    pub hops: Option<u8>,
}

// Analytics

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUser {
    pub user_id: String,
    pub memory_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_memories: u64,
    pub total_users: u64,
    pub growth_rate_7d: f64,
    pub top_users: Vec<TopUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageInterval {
    Hour,
    Day,
    Week,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageQuery {
    pub interval: Option<UsageInterval>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePoint {
    pub date: String,
    pub count: u64,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub data: Vec<UsagePoint>,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub avg_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub total_searches: u64,
}

// Platform administration

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_superadmin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub is_superadmin: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_superadmin: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditLogQuery {
    pub project_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub actor_id: Option<String>,
    pub actor_type: String,
    pub project_id: Option<String>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub payload: Option<Value>,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_users: u64,
    pub active_users: u64,
    pub total_projects: u64,
    pub total_memories: u64,
    pub total_api_calls: u64,
}

// Liveness

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_response_defaults_token_type() {
        let tokens: TokenResponse =
            serde_json::from_value(json!({"access_token": "a", "refresh_token": "r"})).unwrap();
        assert_eq!(tokens.token_type, "bearer");
        assert_eq!(TokenPair::from(tokens), TokenPair::new("a", "r"));
    }

    #[test]
    fn test_memory_reads_metadata_alias() {
        let memory: Memory = serde_json::from_value(json!({
            "id": "7c1c",
            "content": "likes espresso",
            "mem0_user_id": "alice",
            "metadata_": {"source": "chat"},
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-01T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(memory.metadata, Some(json!({"source": "chat"})));
        assert!(memory.categories.is_empty());
        assert_eq!(memory.mem0_agent_id, None);
    }

    #[test]
    fn test_update_profile_omits_unset_fields() {
        let body = serde_json::to_value(UpdateProfileRequest {
            name: Some("Ada".to_string()),
            password: None,
        })
        .unwrap();
        assert_eq!(body, json!({"name": "Ada"}));
    }

    #[test]
    fn test_graph_types_read_type_field() {
        let relation: GraphRelation = serde_json::from_value(json!({
            "id": "r1",
            "source": "alice",
            "target": "espresso",
            "type": "LIKES"
        }))
        .unwrap();
        assert_eq!(relation.relation_type, "LIKES");
        assert_eq!(relation.properties, Value::Null);

        let entity: GraphEntity = serde_json::from_value(json!({"name": "alice"})).unwrap();
        assert_eq!(entity.entity_type, None);
        assert_eq!(entity.relation_count, 0);
    }

    #[test]
    fn test_relation_query_renames_type() {
        let query = crate::query::encode_query(&RelationListQuery {
            relation_type: Some("LIKES".to_string()),
            ..RelationListQuery::default()
        })
        .unwrap();
        assert_eq!(query, "?type=LIKES");
    }

    #[test]
    fn test_usage_interval_is_lowercase() {
        let query = crate::query::encode_query(&UsageQuery {
            interval: Some(UsageInterval::Week),
            days: Some(7),
        })
        .unwrap();
        assert_eq!(query, "?days=7&interval=week");
    }
}
