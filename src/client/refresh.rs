//! 401 interceptor with single-flight token refresh.
//!
//! A request that comes back 401 is replayed at most once:
//!
//! 1. Wait on the refresh gate.
//! 2. If the access token changed since this request was sent, another
//!    request already refreshed; replay with the current token.
//! 3. Otherwise POST `/auth/refresh` with the stored refresh token, store
//!    the new pair and replay.
//!
//! A missing refresh token or a failed refresh tears the session down and
//! publishes [`ClientEvent::LoginRequired`]. A 401 on the replay is reported
//! as [`ApiError::AuthRequired`] without a second refresh.
//!
//! Calls to the auth endpoints themselves are never intercepted.

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::envelope::{self, Envelope};
use super::request::PendingRequest;
use super::{ApiClient, ApiError, ClientEvent};

pub(crate) const REFRESH_PATH: &str = "/auth/refresh";

/// Endpoints whose 401 means "bad credentials", not "expired token".
const UNINTERCEPTED: &[&str] = &["auth/login", "auth/register", "auth/refresh"];

/// Access/refresh pair as returned by login, register and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

fn bypasses_interceptor(path: &str) -> bool {
    let path = path.trim_start_matches('/');
    let path = path.split('?').next().unwrap_or(path);
    UNINTERCEPTED.contains(&path.trim_end_matches('/'))
}

impl ApiClient {
    /// Send with the current token and run the 401 interceptor.
    pub(crate) async fn execute(&self, mut req: PendingRequest) -> Result<Response, ApiError> {
        let sent_with = self.session().current_access_token();
        let response = self.dispatch(&req, sent_with.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || bypasses_interceptor(&req.path) {
            return self.ensure_success(response).await;
        }
        if req.retried {
            warn!(request_id = %req.id, path = %req.path, "unauthorized after replay");
            return Err(ApiError::AuthRequired);
        }

        debug!(request_id = %req.id, path = %req.path, "401 received; refreshing");
        let token = self.refreshed_token(sent_with.as_deref()).await?;
        req.retried = true;

        let replay = self.dispatch(&req, Some(&token)).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!(request_id = %req.id, path = %req.path, "unauthorized after replay");
            return Err(ApiError::AuthRequired);
        }
        self.ensure_success(replay).await
    }

    /// Token to replay with. Only one caller at a time gets past the gate,
    /// so N concurrent 401s cost one refresh call.
    async fn refreshed_token(&self, sent_with: Option<&str>) -> Result<String, ApiError> {
        let _gate = self.inner.refresh_gate.lock().await;

        match (sent_with, self.session().current_access_token()) {
            (Some(_), None) => {
                debug!("session torn down while waiting for refresh");
                return Err(ApiError::AuthRequired);
            }
            (sent, Some(current)) if sent != Some(current.as_str()) => {
                debug!("token already rotated by a concurrent refresh");
                return Ok(current);
            }
            _ => {}
        }

        let Some(refresh_token) = self.session().refresh_token() else {
            info!("no refresh token stored; session ended");
            self.teardown();
            return Err(ApiError::AuthRequired);
        };

        match self.request_token_pair(&refresh_token).await {
            Ok(pair) => {
                if let Err(e) = self.session().set_tokens(&pair.token, &pair.refresh_token) {
                    warn!(error = %e, "refreshed tokens not persisted; continuing in memory");
                }
                info!("access token refreshed");
                self.emit(ClientEvent::TokensRefreshed);
                Ok(pair.token)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed; session ended");
                self.teardown();
                Err(ApiError::AuthRequired)
            }
        }
    }

    /// POST the refresh token. Sent without a bearer header and outside the
    /// interceptor.
    async fn request_token_pair(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let req = PendingRequest::post(REFRESH_PATH)
            .with_json(&serde_json::json!({ "refreshToken": refresh_token }))?;
        let response = self.dispatch(&req, None).await?;
        let response = self.ensure_success(response).await?;
        let envelope: Envelope<TokenPair> = envelope::decode(response).await?;
        envelope.into_data()
    }

    /// Clear credentials and ask the UI for a fresh login.
    pub(crate) fn teardown(&self) {
        if let Err(e) = self.session().clear() {
            warn!(error = %e, "stored credentials could not be removed");
        }
        self.emit(ClientEvent::LoginRequired);
    }
}
