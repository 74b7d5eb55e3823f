//! Common error handling utilities and conventions

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Core error types that can be shared across crates
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_carries_message() {
        let err = CoreError::invalid_config("base_url is required");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: base_url is required"
        );
    }

    #[test]
    fn test_from_config_error() {
        let err: CoreError = config::ConfigError::NotFound("base_url".to_string()).into();
        assert!(matches!(err, CoreError::InvalidConfig { message } if message.contains("base_url")));
    }
}
