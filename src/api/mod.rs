//! Typed facades over [`ApiClient`], one per backend resource.
//!
//! Each facade borrows the client, so `client.projects().list(..)` shares
//! the session and refresh gate with every other call.

pub mod analytics;
pub mod auth;
pub mod documents;
pub mod knowledge;
pub mod learning;
pub mod models;
pub mod projects;
pub mod recommendations;

use crate::client::ApiClient;

pub use analytics::AnalyticsApi;
pub use auth::AuthApi;
pub use documents::DocumentsApi;
pub use knowledge::KnowledgeApi;
pub use learning::LearningApi;
pub use projects::ProjectsApi;
pub use recommendations::RecommendationsApi;

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn projects(&self) -> ProjectsApi<'_> {
        ProjectsApi { client: self }
    }

    pub fn recommendations(&self) -> RecommendationsApi<'_> {
        RecommendationsApi { client: self }
    }

    pub fn knowledge(&self) -> KnowledgeApi<'_> {
        KnowledgeApi { client: self }
    }

    pub fn documents(&self) -> DocumentsApi<'_> {
        DocumentsApi { client: self }
    }

    pub fn learning(&self) -> LearningApi<'_> {
        LearningApi { client: self }
    }

    pub fn analytics(&self) -> AnalyticsApi<'_> {
        AnalyticsApi { client: self }
    }
}
