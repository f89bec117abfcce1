//! Exeloka dashboard API client.
//!
//! [`ApiClient`] is an explicitly constructed handle (no globals) that owns
//! the HTTP connection pool, the [`SessionStore`] and an event channel.
//! Clone it freely: everything lives behind one `Arc`.
//!
//! Request path:
//!
//! ```text
//! facade ─► ApiClient::send ─► execute ─► dispatch (bearer from session)
//!                                 │
//!                                 └─ 401 ─► refresh gate ─► replay once
//! ```
//!
//! Every failure except [`ApiError::AuthRequired`] is also published as a
//! [`ClientEvent::Notice`] so a UI can show it; auth failures publish
//! [`ClientEvent::LoginRequired`] instead.

pub mod download;
pub mod envelope;
pub mod refresh;
pub mod request;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

use crate::config::Config;
use crate::session::{FileStorage, Hydration, SessionStore, Storage, StorageError, User};

pub use download::DownloadedFile;
pub use envelope::{Envelope, Page, PageMeta};
pub use refresh::TokenPair;
pub use request::{Body, MultipartForm, PendingRequest};
#[cfg(feature = "legacy")]
pub(crate) use transport::{network_error, server_message};

/// Fallback text when the server gives no message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";
pub const TIMEOUT_MESSAGE: &str = "Request timeout. Please try again.";
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection.";

const EVENT_BUFFER: usize = 32;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Transport-level failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    Timeout,
    Connect,
    Other,
}

impl std::fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NetworkKind::Timeout => "timeout",
            NetworkKind::Connect => "connect",
            NetworkKind::Other => "transport",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received.
    #[error("network error ({kind}): {message}")]
    Network { kind: NetworkKind, message: String },

    /// Non-2xx response after the refresh interceptor finished.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
    Http { status: u16, message: Option<String>, body: String },

    /// 401 that a token refresh could not resolve.
    #[error("authentication required")]
    AuthRequired,

    /// Legacy fixture router has no entry for this call.
    #[error("mock endpoint not implemented: {endpoint} {method}")]
    UnimplementedMockRoute { endpoint: String, method: String },

    /// 2xx response whose envelope said `success: false`.
    #[error("request rejected: {message}")]
    Rejected { message: String },

    #[error("cannot decode response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("client setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Message to show the user, or `None` when the caller is redirected to
    /// login instead.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ApiError::AuthRequired => None,
            ApiError::Network { kind: NetworkKind::Timeout, .. } => Some(TIMEOUT_MESSAGE.to_string()),
            ApiError::Network { .. } => Some(NETWORK_MESSAGE.to_string()),
            ApiError::Http { message, .. } => {
                Some(message.clone().unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()))
            }
            ApiError::Rejected { message } => Some(message.clone()),
            ApiError::Decode(_) => Some(GENERIC_FAILURE_MESSAGE.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::AuthRequired => Some(401),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Session and error notifications for whatever UI drives the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A failure the user should see.
    Notice(String),
    /// The session was torn down; send the user to the login screen.
    LoginRequired,
    SignedIn(User),
    TokensRefreshed,
    SignedOut,
}

// ── Client ────────────────────────────────────────────────────────────────────

struct Inner {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    /// Held for the duration of one refresh call; concurrent 401s queue here.
    refresh_gate: Mutex<()>,
    events: broadcast::Sender<ClientEvent>,
}

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("authenticated", &self.inner.session.is_authenticated())
            .finish()
    }
}

impl ApiClient {
    /// Build a client against `base_url` with a fixed per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Setup(format!("failed to build HTTP client: {e}")))?;

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, timeout_ms = timeout.as_millis() as u64, "api client ready");

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                session: SessionStore::new(storage),
                refresh_gate: Mutex::new(()),
                events,
            }),
        })
    }

    /// Client backed by `<work_dir>/session.json`.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(config.session_path()));
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_seconds),
            storage,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Receive [`ClientEvent`]s published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        // No subscribers is fine: a CLI run may never listen.
        let _ = self.inner.events.send(event);
    }

    /// Publish the user-facing message for a failure, if it has one.
    pub(crate) fn notify_failure(&self, err: &ApiError) {
        if let Some(message) = err.user_message() {
            self.emit(ClientEvent::Notice(message));
        }
    }

    /// Refuse a request before it is sent. The caller sees the same notice
    /// a failed send would publish.
    pub(crate) fn reject<T>(&self, err: ApiError) -> Result<T, ApiError> {
        self.surface(Err(err))
    }

    /// Hydrate the session from storage and confirm the token with the server.
    ///
    /// Returns the current user, or `None` when there is no usable session.
    /// A token the server no longer accepts is cleared.
    pub async fn restore(&self) -> Result<Option<User>, ApiError> {
        let hydration = self.surface(self.session().hydrate().map_err(ApiError::from))?;
        match hydration {
            Hydration::Anonymous => Ok(None),
            #[cfg(feature = "testing-bypass")]
            Hydration::Bypassed(user) => Ok(Some(user)),
            Hydration::NeedsValidation => match self.auth().me().await {
                Ok(user) => {
                    self.session().set_user(user.clone());
                    info!(user_id = user.id, "stored session validated");
                    Ok(Some(user))
                }
                Err(e) => {
                    info!(error = %e, "stored session rejected; clearing");
                    self.surface(self.session().clear().map_err(ApiError::from))?;
                    Ok(None)
                }
            },
        }
    }

    // ── generic request helpers ───────────────────────────────────────

    /// Send a request through the refresh interceptor and return the raw
    /// 2xx response.
    pub async fn send(&self, req: PendingRequest) -> Result<reqwest::Response, ApiError> {
        let result = self.execute(req).await;
        if let Err(e) = &result {
            self.notify_failure(e);
        }
        result
    }

    /// Send and unwrap the envelope's `data`.
    pub async fn request<T: DeserializeOwned>(&self, req: PendingRequest) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.request_envelope(req).await?;
        self.surface(envelope.into_data())
    }

    /// Send and unwrap a list response together with its `meta` block.
    pub async fn request_page<T: DeserializeOwned>(
        &self,
        req: PendingRequest,
    ) -> Result<Page<T>, ApiError> {
        let envelope: Envelope<Vec<T>> = self.request_envelope(req).await?;
        self.surface(envelope.into_page())
    }

    /// Send a request whose envelope carries no useful `data`; returns the
    /// server message, if any.
    pub async fn request_ack(&self, req: PendingRequest) -> Result<Option<String>, ApiError> {
        let envelope: Envelope<serde_json::Value> = self.request_envelope(req).await?;
        self.surface(envelope.into_ack())
    }

    /// Send and collect a binary body.
    pub async fn download(
        &self,
        req: PendingRequest,
        fallback_filename: Option<&str>,
    ) -> Result<DownloadedFile, ApiError> {
        let response = self.send(req).await?;
        let result = DownloadedFile::from_response(response, fallback_filename).await;
        self.surface(result)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(PendingRequest::get(path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(PendingRequest::post(path).with_json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(PendingRequest::put(path).with_json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<Option<String>, ApiError> {
        self.request_ack(PendingRequest::delete(path)).await
    }

    async fn request_envelope<T: DeserializeOwned>(
        &self,
        req: PendingRequest,
    ) -> Result<Envelope<T>, ApiError> {
        let response = self.send(req).await?;
        self.surface(envelope::decode(response).await)
    }

    /// Pass `result` through, publishing a notice when it failed.
    pub(crate) fn surface<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(e) = &result {
            self.notify_failure(e);
        }
        result
    }
}
