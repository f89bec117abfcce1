//! Single physical HTTP send plus response/error classification.

use std::time::Instant;

use reqwest::Response;
use tracing::{debug, trace, warn};

use super::request::{Body, PendingRequest};
use super::{ApiClient, ApiError, NetworkKind};

impl ApiClient {
    pub(crate) fn resolve_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// Send `req` once, attaching `Authorization: Bearer <token>` only when a
    /// token is given. Any HTTP status is returned as `Ok`.
    pub(crate) async fn dispatch(
        &self,
        req: &PendingRequest,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self.resolve_url(&req.path);
        let mut builder = self.inner.http.request(req.method.clone(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &req.body {
            Body::Empty => builder,
            Body::Json(value) => {
                trace!(request_id = %req.id, body = %value, "request payload");
                builder.json(value)
            }
            Body::Multipart(form) => builder.multipart(form.build()?),
        };

        debug!(
            request_id = %req.id,
            method = %req.method,
            path = %req.path,
            authorized = token.is_some(),
            retried = req.retried,
            "sending request"
        );

        let started = Instant::now();
        match builder.send().await {
            Ok(response) => {
                debug!(
                    request_id = %req.id,
                    status = response.status().as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "response received"
                );
                Ok(response)
            }
            Err(e) => {
                let err = network_error(&e);
                warn!(request_id = %req.id, path = %req.path, error = %err, "request failed before a response");
                Err(err)
            }
        }
    }

    /// Pass 2xx responses through; turn anything else into [`ApiError::Http`].
    pub(crate) async fn ensure_success(&self, response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(http_error(response).await)
    }
}

/// Classify a reqwest failure that produced no response.
pub(crate) fn network_error(e: &reqwest::Error) -> ApiError {
    let kind = if e.is_timeout() {
        NetworkKind::Timeout
    } else if e.is_connect() {
        NetworkKind::Connect
    } else {
        NetworkKind::Other
    };
    ApiError::Network { kind, message: e.to_string() }
}

async fn http_error(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = server_message(&body);
    debug!(status = status.as_u16(), body_len = body.len(), "non-success response");
    ApiError::Http { status: status.as_u16(), message, body }
}

/// `message` (or `error`) field of a JSON error body.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_prefers_message() {
        let body = r#"{"success":false,"message":"Project not found","error":"E404"}"#;
        assert_eq!(server_message(body).as_deref(), Some("Project not found"));
    }

    #[test]
    fn server_message_falls_back_to_error() {
        let body = r#"{"success":false,"error":"Invalid credentials"}"#;
        assert_eq!(server_message(body).as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn server_message_ignores_non_json_and_blank() {
        assert_eq!(server_message("<html>Bad Gateway</html>"), None);
        assert_eq!(server_message(r#"{"message":"  "}"#), None);
    }
}
