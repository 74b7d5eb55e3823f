//! Memboard API client

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod graph;
pub mod health;
pub mod members;
pub mod memories;
pub mod projects;
pub mod webhooks;

use crate::cache::EntityCache;
use crate::dispatcher::{ApiResponse, Dispatcher, RequestDescriptor};
use crate::error::{ClientError, Result};
use crate::query::encode_path_segment;
use crate::token_store::TokenStore;
use crate::types::Project;
use memboard_core::settings::DEFAULT_CACHE_TTL_MS;
use memboard_core::{ClientSettings, Clock, SystemClock};
use reqwest::ClientBuilder;
use std::sync::Arc;
use std::time::Duration;

/// Client for one dashboard session
///
/// Clones share the token store, the refresh coordinator and the project
/// cache.
#[derive(Debug, Clone)]
pub struct ApiClient {
    dispatcher: Dispatcher,
    projects: EntityCache<Project>,
    health_timeout: Duration,
}

impl ApiClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `base_url` is not a valid URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a client from loaded settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings are invalid
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        settings.validate()?;
        Self::builder().settings(settings).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the backend origin
    pub fn base_url(&self) -> &str {
        self.dispatcher.origin()
    }

    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The session's token store
    pub const fn tokens(&self) -> &TokenStore {
        self.dispatcher.tokens()
    }

    /// Cache backing [`ApiClient::project`]
    pub const fn project_cache(&self) -> &EntityCache<Project> {
        &self.projects
    }

    /// Execute an arbitrary API request
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse> {
        self.dispatcher.request(descriptor).await
    }
}

/// `/projects/{slug}` with the slug escaped
pub(crate) fn project_path(slug: &str) -> String {
    format!("/projects/{}", encode_path_segment(slug))
}

/// `{base}/{id}` with the id escaped
pub(crate) fn child_path(base: &str, id: &str) -> String {
    format!("{base}/{}", encode_path_segment(id))
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    api_prefix: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    health_timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
    tokens: Option<TokenStore>,
    clock: Option<Arc<dyn Clock>>,
}

impl ApiClientBuilder {
    /// Set the base URL (scheme, host and port)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the path prefix of API routes (default `/api/v1`)
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set a transport timeout. Unset by default: callers own deadlines.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the liveness check timeout
    pub const fn health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = Some(timeout);
        self
    }

    /// Set the project cache time-to-live
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Use an existing token store instead of a fresh, empty one
    pub fn tokens(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Use a custom clock for cache freshness
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Apply every value from loaded settings
    pub fn settings(mut self, settings: &ClientSettings) -> Self {
        self.base_url = Some(settings.base_url.clone());
        self.api_prefix = Some(settings.api_prefix.clone());
        self.user_agent = Some(settings.user_agent.clone());
        self.timeout = settings.request_timeout();
        self.health_timeout = Some(settings.health_timeout());
        self.cache_ttl = Some(settings.cache_ttl());
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is missing or invalid,
    /// or the HTTP client cannot be constructed
    pub fn build(self) -> Result<ApiClient> {
        let defaults = ClientSettings::default();

        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::configuration("base_url is required"))?;
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| ClientError::configuration(format!("invalid base_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::configuration(format!(
                "base_url must use http or https, got {}",
                parsed.scheme()
            )));
        }

        let mut client_builder = ClientBuilder::new()
            .user_agent(self.user_agent.unwrap_or(defaults.user_agent.clone()));
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let http = client_builder
            .build()
            .map_err(|e| ClientError::configuration(format!("failed to build HTTP client: {e}")))?;

        let api_prefix = self.api_prefix.unwrap_or(defaults.api_prefix.clone());
        let dispatcher = Dispatcher::new(
            http,
            &base_url,
            &api_prefix,
            self.tokens.unwrap_or_default(),
        );

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let cache_ttl = self
            .cache_ttl
            .unwrap_or(Duration::from_millis(DEFAULT_CACHE_TTL_MS));

        Ok(ApiClient {
            dispatcher,
            projects: EntityCache::with_clock(cache_ttl, clock),
            health_timeout: self.health_timeout.unwrap_or(defaults.health_timeout()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let err = ApiClient::builder().build().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_builder_rejects_unsupported_scheme() {
        let err = ApiClient::new("ftp://memory.example.com").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_builder_applies_settings() {
        let settings = ClientSettings {
            base_url: "https://memory.example.com/".to_string(),
            cache_ttl_ms: 5_000,
            ..ClientSettings::default()
        };
        let client = ApiClient::from_settings(&settings).unwrap();
        assert_eq!(client.base_url(), "https://memory.example.com");
        assert_eq!(client.project_cache().ttl(), Duration::from_secs(5));
        assert_eq!(
            client.dispatcher().url("/projects"),
            "https://memory.example.com/api/v1/projects"
        );
    }

    #[test]
    fn test_paths_escape_identifiers() {
        assert_eq!(project_path("demo"), "/projects/demo");
        assert_eq!(project_path("../admin"), "/projects/..%2Fadmin");
        assert_eq!(
            child_path(&project_path("demo"), "m1?x#y"),
            "/projects/demo/m1%3Fx%23y"
        );
    }

    #[test]
    fn test_builder_shares_injected_token_store() {
        let tokens = TokenStore::new();
        let client = ApiClient::builder()
            .base_url("http://localhost:8000")
            .tokens(tokens.clone())
            .build()
            .unwrap();
        tokens.set("a", "r");
        assert!(client.tokens().is_authenticated());
    }
}
