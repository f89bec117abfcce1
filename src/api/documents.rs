use serde_json::Value;

use super::models::{DocumentFormat, DocumentQuery, DocumentRecord, DocumentRequest, GeneratedDocument};
use crate::client::{ApiClient, ApiError, DownloadedFile, Page, PendingRequest};

pub struct DocumentsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl DocumentsApi<'_> {
    pub async fn generate(
        &self,
        format: DocumentFormat,
        request: &DocumentRequest,
    ) -> Result<GeneratedDocument, ApiError> {
        self.client
            .post(&format!("/documents/generate/{}", format.as_str()), request)
            .await
    }

    pub async fn list(&self, query: &DocumentQuery) -> Result<Page<DocumentRecord>, ApiError> {
        let req = PendingRequest::get("/documents")
            .with_optional_query("page", query.page)
            .with_optional_query("limit", query.limit)
            .with_optional_query("document_type", query.document_type.map(DocumentFormat::as_str))
            .with_optional_query("recommendation_id", query.recommendation_id);
        self.client.request_page(req).await
    }

    /// Fetch a generated file. The name comes from `Content-Disposition`,
    /// falling back to `filename`.
    pub async fn download(&self, filename: &str) -> Result<DownloadedFile, ApiError> {
        if filename.trim().is_empty() || filename.contains('/') {
            return self
                .client
                .reject(ApiError::InvalidRequest(format!("bad document filename '{filename}'")));
        }
        let req = PendingRequest::get(format!("/documents/download/{filename}"));
        self.client.download(req, Some(filename)).await
    }

    pub async fn stats(&self) -> Result<Value, ApiError> {
        self.client.get("/documents/stats").await
    }
}
