//! Client settings
//!
//! Settings are layered the same way everywhere: built-in defaults, then an
//! optional TOML/YAML file, then `MEMBOARD_*` environment variables.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix for environment variable overrides (`MEMBOARD_BASE_URL`, ...)
pub const ENV_PREFIX: &str = "MEMBOARD";

/// Default lifetime of an entity cache entry, in milliseconds
pub const DEFAULT_CACHE_TTL_MS: u64 = 60_000;

/// Settings consumed by the API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Origin of the backend API, without a trailing slash
    pub base_url: String,

    /// Path prefix of the versioned API routes
    pub api_prefix: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Optional transport timeout. `None` leaves timeouts to the caller.
    pub request_timeout_secs: Option<u64>,

    /// Timeout applied by the liveness check
    pub health_timeout_secs: u64,

    /// Entity cache time-to-live in milliseconds
    pub cache_ttl_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            user_agent: concat!("memboard-client/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: None,
            health_timeout_secs: 5,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

impl ClientSettings {
    /// Load settings from a file, with environment overrides on top
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting settings fail validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        Self::layered(Some(path.as_ref()), environment())
    }

    /// Load settings from defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> CoreResult<Self> {
        Self::layered(None, environment())
    }

    fn layered(file: Option<&Path>, env: config::Environment) -> CoreResult<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings: Self = builder.add_source(env).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings describe a usable client
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] describing the first problem found
    pub fn validate(&self) -> CoreResult<()> {
        let base = url::Url::parse(&self.base_url)
            .map_err(|e| CoreError::invalid_config(format!("invalid base_url: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(CoreError::invalid_config(format!(
                "base_url must use http or https, got {}",
                base.scheme()
            )));
        }
        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(CoreError::invalid_config(
                "api_prefix must start with '/'",
            ));
        }
        if self.cache_ttl_ms == 0 {
            return Err(CoreError::invalid_config("cache_ttl_ms must be positive"));
        }
        Ok(())
    }

    /// Transport timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Liveness check timeout
    pub const fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    /// Entity cache time-to-live
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ClientSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cache_ttl(), Duration::from_secs(60));
        assert_eq!(settings.request_timeout(), None);
        assert_eq!(settings.api_prefix, "/api/v1");
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "base_url = \"https://memory.example.com\"\ncache_ttl_ms = 1500\nrequest_timeout_secs = 30"
        )
        .unwrap();

        let settings = ClientSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.base_url, "https://memory.example.com");
        assert_eq!(settings.cache_ttl_ms, 1500);
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));
        // Untouched keys keep their defaults
        assert_eq!(settings.api_prefix, "/api/v1");
        assert_eq!(settings.health_timeout_secs, 5);
    }

    fn env_source(vars: &[(&str, &str)]) -> config::Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let env = env_source(&[
            ("MEMBOARD_BASE_URL", "https://env.example.com"),
            ("MEMBOARD_CACHE_TTL_MS", "2500"),
            ("UNRELATED_CACHE_TTL_MS", "1"),
        ]);

        let settings = ClientSettings::layered(None, env).unwrap();
        assert_eq!(settings.base_url, "https://env.example.com");
        assert_eq!(settings.cache_ttl(), Duration::from_millis(2500));
        assert_eq!(settings.api_prefix, "/api/v1");
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "base_url = \"https://file.example.com\"\ncache_ttl_ms = 1500"
        )
        .unwrap();
        let env = env_source(&[("MEMBOARD_CACHE_TTL_MS", "9000")]);

        let settings = ClientSettings::layered(Some(file.path()), env).unwrap();
        assert_eq!(settings.base_url, "https://file.example.com");
        assert_eq!(settings.cache_ttl_ms, 9000);
    }

    #[test]
    fn test_invalid_environment_value_is_rejected() {
        let env = env_source(&[("MEMBOARD_CACHE_TTL_MS", "0")]);
        let err = ClientSettings::layered(None, env).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "base_url = \"ftp://memory.example.com\"").unwrap();

        let err = ClientSettings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_prefix_and_ttl() {
        let settings = ClientSettings {
            api_prefix: "api/v1".to_string(),
            ..ClientSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = ClientSettings {
            cache_ttl_ms: 0,
            ..ClientSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = ClientSettings {
            base_url: "not a url".to_string(),
            ..ClientSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
