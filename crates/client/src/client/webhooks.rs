//! Webhook API client methods

use super::{ApiClient, child_path, project_path};
use crate::dispatcher::RequestDescriptor;
use crate::error::Result;
use crate::types::{CreateWebhookRequest, UpdateWebhookRequest, Webhook, WebhookDelivery};

fn webhooks_path(slug: &str) -> String {
    format!("{}/webhooks", project_path(slug))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn list_webhooks(&self, slug: &str) -> Result<Vec<Webhook>> {
        self.dispatcher
            .request_json(&RequestDescriptor::get(webhooks_path(slug)))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn create_webhook(
        &self,
        slug: &str,
        request: &CreateWebhookRequest,
    ) -> Result<Webhook> {
        let descriptor = RequestDescriptor::post(webhooks_path(slug)).json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn update_webhook(
        &self,
        slug: &str,
        webhook_id: &str,
        request: &UpdateWebhookRequest,
    ) -> Result<Webhook> {
        let path = child_path(&webhooks_path(slug), webhook_id);
        let descriptor = RequestDescriptor::patch(path).json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn delete_webhook(&self, slug: &str, webhook_id: &str) -> Result<()> {
        let path = child_path(&webhooks_path(slug), webhook_id);
        self.dispatcher
            .request_json(&RequestDescriptor::delete(path))
            .await
    }

    /// Send a test event and return the recorded delivery
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the webhook belongs to another project
    pub async fn test_webhook(&self, slug: &str, webhook_id: &str) -> Result<WebhookDelivery> {
        let path = format!("{}/test", child_path(&webhooks_path(slug), webhook_id));
        self.dispatcher
            .request_json(&RequestDescriptor::post(path))
            .await
    }

    /// Delivery attempts of one webhook, newest first
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn webhook_deliveries(
        &self,
        slug: &str,
        webhook_id: &str,
    ) -> Result<Vec<WebhookDelivery>> {
        let path = format!("{}/deliveries", child_path(&webhooks_path(slug), webhook_id));
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }
}
