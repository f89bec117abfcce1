use serde_json::Value;

use crate::client::{ApiClient, ApiError, PendingRequest};

/// Feedback-driven learning endpoints. Payloads are free-form analytics
/// blobs, so they are returned as JSON values.
pub struct LearningApi<'a> {
    pub(super) client: &'a ApiClient,
}

#[derive(Debug, Clone, Default)]
pub struct InsightQuery {
    pub insight_type: Option<String>,
    pub limit: Option<u32>,
    pub min_confidence: Option<f64>,
}

impl LearningApi<'_> {
    pub async fn insights(&self, query: &InsightQuery) -> Result<Value, ApiError> {
        let req = PendingRequest::get("/recommendations/learning/insights")
            .with_optional_query("insight_type", query.insight_type.as_deref())
            .with_optional_query("limit", query.limit)
            .with_optional_query("min_confidence", query.min_confidence);
        self.client.request(req).await
    }

    pub async fn stats(&self) -> Result<Value, ApiError> {
        self.client.get("/recommendations/learning/stats").await
    }

    pub async fn feedback_summary(&self, recommendation_id: i64) -> Result<Value, ApiError> {
        self.client
            .get(&format!("/recommendations/{recommendation_id}/feedback-summary"))
            .await
    }
}
