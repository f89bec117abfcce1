use serde_json::json;

use super::models::{
    DocumentFormat, Feedback, GenerateRecommendation, GeneratedDocument, Recommendation,
    RecommendationQuery,
};
use crate::client::{ApiClient, ApiError, Page, PendingRequest};

pub struct RecommendationsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl RecommendationsApi<'_> {
    /// Run a quick or enhanced analysis for a project.
    pub async fn generate(&self, request: &GenerateRecommendation) -> Result<Recommendation, ApiError> {
        self.client.post("/recommendations/generate", request).await
    }

    pub async fn list(&self, query: &RecommendationQuery) -> Result<Page<Recommendation>, ApiError> {
        let req = PendingRequest::get("/recommendations")
            .with_optional_query("page", query.page)
            .with_optional_query("limit", query.limit)
            .with_optional_query("project_id", query.project_id);
        self.client.request_page(req).await
    }

    pub async fn for_project(&self, project_id: i64) -> Result<Page<Recommendation>, ApiError> {
        self.list(&RecommendationQuery { project_id: Some(project_id), ..Default::default() })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Recommendation, ApiError> {
        self.client.get(&format!("/recommendations/{id}")).await
    }

    pub async fn submit_feedback(&self, id: i64, feedback: &Feedback) -> Result<Option<String>, ApiError> {
        if !(1..=5).contains(&feedback.rating) {
            return self.client.reject(ApiError::InvalidRequest(format!(
                "rating must be between 1 and 5, got {}",
                feedback.rating
            )));
        }
        let req = self
            .client
            .surface(PendingRequest::post(format!("/recommendations/{id}/feedback")).with_json(feedback))?;
        self.client.request_ack(req).await
    }

    pub async fn generate_document(
        &self,
        id: i64,
        format: DocumentFormat,
    ) -> Result<GeneratedDocument, ApiError> {
        self.client
            .post(
                &format!("/recommendations/{id}/generate-document"),
                &json!({ "format": format.as_str() }),
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<Option<String>, ApiError> {
        self.client.delete(&format!("/recommendations/{id}")).await
    }
}
