//! Project analytics API client methods

use super::{ApiClient, project_path};
use crate::dispatcher::RequestDescriptor;
use crate::error::Result;
use crate::query::encode_query;
use crate::types::{AnalyticsOverview, RetrievalStats, UsageQuery, UsageReport};
use serde::Serialize;

fn analytics_path(slug: &str) -> String {
    format!("{}/analytics", project_path(slug))
}

#[derive(Serialize)]
struct DaysQuery {
    days: Option<u32>,
}

impl ApiClient {
    /// Memory and user totals with the 7-day growth rate
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn analytics_overview(&self, slug: &str) -> Result<AnalyticsOverview> {
        let path = format!("{}/overview", analytics_path(slug));
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// Operation counts bucketed by interval
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn analytics_usage(&self, slug: &str, query: &UsageQuery) -> Result<UsageReport> {
        let path = format!("{}/usage{}", analytics_path(slug), encode_query(query)?);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// Search latency percentiles over the last `days` (backend default 30)
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn analytics_retrieval(
        &self,
        slug: &str,
        days: Option<u32>,
    ) -> Result<RetrievalStats> {
        let path = format!(
            "{}/retrieval{}",
            analytics_path(slug),
            encode_query(&DaysQuery { days })?
        );
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }
}
