use serde::Deserialize;
use serde_json::Value;

use crate::client::{ApiClient, ApiError, PendingRequest};

pub struct AnalyticsApi<'a> {
    pub(super) client: &'a ApiClient,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSummary {
    #[serde(default)]
    pub projects: Value,
    #[serde(default)]
    pub recommendations: Value,
    #[serde(default)]
    pub recent_activity: Vec<Value>,
}

/// Dashboard window in days.
pub const DEFAULT_RANGE_DAYS: u32 = 30;

impl AnalyticsApi<'_> {
    pub async fn summary(&self) -> Result<AnalyticsSummary, ApiError> {
        self.client.get("/recommendations/analytics").await
    }

    pub async fn dashboard(&self, range_days: u32) -> Result<Value, ApiError> {
        let req = PendingRequest::get("/recommendations/analytics/dashboard")
            .with_query("range", range_days);
        self.client.request(req).await
    }
}
