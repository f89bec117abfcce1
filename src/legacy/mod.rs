//! Client for the legacy static-site API (`/auth.php`, `/projects.php`, …).
//!
//! The legacy backend keeps a PHP session cookie instead of bearer tokens,
//! so this client owns its own cookie-enabled connection pool and never
//! touches [`crate::session`]. Calls go to [`MockRouter`] when `use_mock` is
//! set, or after a transport-level failure when `mock_fallback` is set.
//! HTTP error statuses are never masked by the fixtures.

pub mod mock;

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::{ApiError, Body, MultipartForm, network_error, server_message};
use crate::config::LegacyConfig;

pub use mock::MockRouter;

pub struct LegacyClient {
    http: reqwest::Client,
    base_url: String,
    use_mock: bool,
    mock_fallback: bool,
    router: MockRouter,
}

/// Knowledge listing filters (`type`, `search`).
#[derive(Debug, Clone, Default)]
pub struct KnowledgeFilter {
    pub kind: Option<String>,
    pub search: Option<String>,
}

impl LegacyClient {
    pub fn new(config: &LegacyConfig, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Setup(format!("failed to build legacy HTTP client: {e}")))?;
        debug!(base_url = %config.base_url, use_mock = config.use_mock, "legacy client ready");
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            use_mock: config.use_mock,
            mock_fallback: config.mock_fallback,
            router: MockRouter::new(),
        })
    }

    pub fn uses_mock(&self) -> bool {
        self.use_mock
    }

    /// Send `method endpoint` (endpoint includes any query string).
    pub async fn request(&self, endpoint: &str, method: Method, body: Body) -> Result<Value, ApiError> {
        if self.use_mock {
            debug!(%endpoint, %method, "legacy request served by fixtures");
            return self.router.route(endpoint, &method, &body);
        }
        match self.send(endpoint, &method, &body).await {
            Err(e) if e.is_network() && self.mock_fallback => {
                warn!(%endpoint, error = %e, "legacy API unreachable; falling back to fixtures");
                self.router.route(endpoint, &method, &body)
            }
            other => other,
        }
    }

    async fn send(&self, endpoint: &str, method: &Method, body: &Body) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let mut builder = self.http.request(method.clone(), &url);
        builder = match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(form) => builder.multipart(form.build()?),
        };

        let response = builder.send().await.map_err(|e| network_error(&e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Decode(format!("cannot read legacy response: {e}")))?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: server_message(&text),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(endpoint, Method::GET, Body::Empty).await
    }

    async fn send_json(&self, endpoint: &str, method: Method, body: Value) -> Result<Value, ApiError> {
        self.request(endpoint, method, Body::Json(body)).await
    }

    // ── auth ──────────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<Value, ApiError> {
        let out = self
            .send_json("/auth.php", Method::POST, json!({ "action": "login", "email": email, "password": password }))
            .await?;
        info!(%email, "legacy login succeeded");
        Ok(out)
    }

    /// `registration` fields are merged next to `action: "register"`.
    pub async fn register(&self, registration: &Value) -> Result<Value, ApiError> {
        let mut body = json!({ "action": "register" });
        if let (Some(target), Some(fields)) = (body.as_object_mut(), registration.as_object()) {
            for (key, value) in fields {
                target.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        self.send_json("/auth.php", Method::POST, body).await
    }

    pub async fn logout(&self) -> Result<Value, ApiError> {
        self.send_json("/auth.php", Method::POST, json!({ "action": "logout" })).await
    }

    // ── projects ──────────────────────────────────────────────────────

    pub async fn projects(&self) -> Result<Value, ApiError> {
        self.get("/projects.php").await
    }

    pub async fn project(&self, id: i64) -> Result<Value, ApiError> {
        self.get(&format!("/projects.php?id={id}")).await
    }

    pub async fn create_project(&self, project: &Value) -> Result<Value, ApiError> {
        self.send_json("/projects.php", Method::POST, project.clone()).await
    }

    pub async fn update_project(&self, id: i64, project: &Value) -> Result<Value, ApiError> {
        self.send_json(&format!("/projects.php?id={id}"), Method::PUT, project.clone()).await
    }

    pub async fn delete_project(&self, id: i64) -> Result<Value, ApiError> {
        self.request(&format!("/projects.php?id={id}"), Method::DELETE, Body::Empty).await
    }

    // ── recommendations ───────────────────────────────────────────────

    pub async fn recommendations(&self, project_id: Option<i64>) -> Result<Value, ApiError> {
        match project_id {
            Some(id) => self.get(&format!("/recommendations.php?project={id}")).await,
            None => self.get("/recommendations.php").await,
        }
    }

    pub async fn recommendation(&self, id: i64) -> Result<Value, ApiError> {
        self.get(&format!("/recommendations.php?id={id}")).await
    }

    pub async fn generate_recommendation(&self, request: &Value) -> Result<Value, ApiError> {
        let mut body = request.clone();
        if let Some(obj) = body.as_object_mut() {
            obj.insert("action".into(), json!("generate"));
        }
        self.send_json("/recommendations.php", Method::POST, body).await
    }

    pub async fn submit_feedback(&self, recommendation_id: i64, feedback: &Value) -> Result<Value, ApiError> {
        let mut body = feedback.clone();
        if let Some(obj) = body.as_object_mut() {
            obj.insert("action".into(), json!("feedback"));
            obj.insert("recommendation_id".into(), json!(recommendation_id));
        }
        self.send_json("/recommendations.php", Method::POST, body).await
    }

    // ── knowledge ─────────────────────────────────────────────────────

    pub async fn knowledge(&self, page: u32, filter: &KnowledgeFilter) -> Result<Value, ApiError> {
        let mut endpoint = format!("/knowledge.php?page={}", page.max(1));
        if let Some(kind) = &filter.kind {
            endpoint.push_str(&format!("&type={}", encode(kind)));
        }
        if let Some(search) = &filter.search {
            endpoint.push_str(&format!("&search={}", encode(search)));
        }
        self.get(&endpoint).await
    }

    pub async fn knowledge_item(&self, id: i64) -> Result<Value, ApiError> {
        self.get(&format!("/knowledge.php?id={id}")).await
    }

    pub async fn add_knowledge(&self, item: &Value) -> Result<Value, ApiError> {
        self.send_json("/knowledge.php", Method::POST, item.clone()).await
    }

    pub async fn update_knowledge(&self, id: i64, changes: &Value) -> Result<Value, ApiError> {
        self.send_json(&format!("/knowledge.php?id={id}"), Method::PUT, changes.clone()).await
    }

    pub async fn delete_knowledge(&self, id: i64) -> Result<Value, ApiError> {
        self.request(&format!("/knowledge.php?id={id}"), Method::DELETE, Body::Empty).await
    }

    pub async fn upload_document(
        &self,
        filename: &str,
        mime: Option<&str>,
        bytes: Vec<u8>,
        metadata: &Value,
    ) -> Result<Value, ApiError> {
        let form = MultipartForm::new()
            .file("file", filename, mime, bytes)
            .text("metadata", metadata.to_string());
        self.request("/knowledge.php", Method::POST, Body::Multipart(form)).await
    }

    pub async fn extract_content(&self, source: &str, kind: &str) -> Result<Value, ApiError> {
        self.send_json(
            "/knowledge.php",
            Method::POST,
            json!({ "action": "extract", "source": source, "type": kind }),
        )
        .await
    }
}

/// Percent-encode a query value.
fn encode(value: &str) -> String {
    reqwest::Url::parse_with_params("http://q.invalid/", &[("v", value)])
        .ok()
        .and_then(|url| url.query().map(|q| q.trim_start_matches("v=").to_string()))
        .unwrap_or_default()
}
