use serde_json::Value;

use super::models::{
    AddedEntry, Category, IngestRequest, KnowledgeEntry, KnowledgeSource, SearchFilters, SearchHit,
    SourceQuery, UploadFile,
};
use crate::client::{ApiClient, ApiError, MultipartForm, Page, PendingRequest};

pub struct KnowledgeApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl KnowledgeApi<'_> {
    /// Queue a source for server-side processing.
    pub async fn ingest(&self, request: &IngestRequest) -> Result<KnowledgeSource, ApiError> {
        self.client.post("/knowledge/ingest", request).await
    }

    pub async fn add_entry(&self, entry: &KnowledgeEntry) -> Result<AddedEntry, ApiError> {
        self.client.post("/knowledge/direct", entry).await
    }

    /// Same endpoint as [`add_entry`](Self::add_entry), as multipart with an
    /// attached file.
    pub async fn upload(&self, entry: &KnowledgeEntry, file: UploadFile) -> Result<AddedEntry, ApiError> {
        let mut form = MultipartForm::new()
            .text("title", entry.title.clone())
            .text("source_type", entry.source_type.as_str());
        if let Some(url) = &entry.source_url {
            form = form.text("source_url", url.clone());
        }
        if let Some(text) = &entry.content_text {
            form = form.text("content_text", text.clone());
        }
        if let Some(category) = entry.category_id {
            form = form.text("category_id", category.to_string());
        }
        if !entry.tags.is_empty() {
            let tags = self.client.surface(
                serde_json::to_string(&entry.tags)
                    .map_err(|e| ApiError::InvalidRequest(format!("cannot encode tags: {e}"))),
            )?;
            form = form.text("tags", tags);
        }
        if let Some(context) = &entry.cultural_context {
            form = form.text("cultural_context", context.clone());
        }
        if let Some(score) = entry.importance_score {
            form = form.text("importance_score", score.to_string());
        }
        let form = form.file("file", file.filename, file.mime.as_deref(), file.bytes);

        let req = PendingRequest::post("/knowledge/direct").with_multipart(form);
        self.client.request(req).await
    }

    pub async fn search(&self, query: &str, filters: &SearchFilters) -> Result<Page<SearchHit>, ApiError> {
        if query.trim().is_empty() {
            return self
                .client
                .reject(ApiError::InvalidRequest("search query must not be empty".into()));
        }
        let req = PendingRequest::get("/knowledge/search")
            .with_query("query", query)
            .with_optional_query("category", filters.category.as_deref())
            .with_optional_query("source_type", filters.source_type.map(|t| t.as_str()))
            .with_optional_query("importance_level", filters.importance_level.as_deref())
            .with_optional_query("limit", filters.limit)
            .with_optional_query("offset", filters.offset);
        self.client.request_page(req).await
    }

    pub async fn sources(&self, query: &SourceQuery) -> Result<Page<KnowledgeSource>, ApiError> {
        let req = PendingRequest::get("/knowledge/sources")
            .with_optional_query("page", query.page)
            .with_optional_query("limit", query.limit)
            .with_optional_query("source_type", query.source_type.map(|t| t.as_str()));
        self.client.request_page(req).await
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.client.get("/knowledge/categories").await
    }

    /// Source with its extracted wisdom entries; shape varies by source type.
    pub async fn get(&self, id: i64) -> Result<Value, ApiError> {
        self.client.get(&format!("/knowledge/{id}")).await
    }

    pub async fn delete_source(&self, id: i64) -> Result<Option<String>, ApiError> {
        self.client.delete(&format!("/knowledge/sources/{id}")).await
    }
}
