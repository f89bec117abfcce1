use super::models::{ListQuery, Project, ProjectDraft, PromptTemplates};
use crate::client::{ApiClient, ApiError, Page, PendingRequest};

const BASE: &str = "/recommendations/projects";

pub struct ProjectsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl ProjectsApi<'_> {
    pub async fn create(&self, draft: &ProjectDraft) -> Result<Project, ApiError> {
        self.client.post(BASE, draft).await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Project>, ApiError> {
        let req = PendingRequest::get(BASE)
            .with_optional_query("page", query.page)
            .with_optional_query("limit", query.limit);
        self.client.request_page(req).await
    }

    pub async fn get(&self, id: i64) -> Result<Project, ApiError> {
        self.client.get(&format!("{BASE}/{id}")).await
    }

    /// Returns the updated record.
    pub async fn update(&self, id: i64, changes: &ProjectDraft) -> Result<Project, ApiError> {
        self.client.put(&format!("{BASE}/{id}"), changes).await
    }

    /// Also deletes the project's recommendations; returns the server message.
    pub async fn delete(&self, id: i64) -> Result<Option<String>, ApiError> {
        self.client.delete(&format!("{BASE}/{id}")).await
    }

    pub async fn prompt_templates(&self) -> Result<PromptTemplates, ApiError> {
        self.client.get("/recommendations/prompt-templates").await
    }
}
