//! Liveness check

use super::ApiClient;
use crate::dispatcher::Dispatcher;
use crate::error::{ClientError, Result};
use crate::types::HealthStatus;
use tracing::debug;

impl ApiClient {
    /// Ask the backend whether it is up, giving up after the configured
    /// health timeout
    ///
    /// # Errors
    ///
    /// Returns a network error on timeout or connection failure, or the
    /// normalized failure status
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.dispatcher.origin());
        let check = async {
            let response = self
                .dispatcher
                .http()
                .get(url)
                .send()
                .await
                .map_err(|e| ClientError::network(&e))?;
            Dispatcher::into_result(response)
                .await?
                .parse::<HealthStatus>()
        };

        let status = tokio::time::timeout(self.health_timeout, check)
            .await
            .map_err(|_| ClientError::timeout(self.health_timeout))??;
        debug!(status = %status.status, "Health check answered");
        Ok(status)
    }
}
