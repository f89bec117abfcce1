//! `{success, data, message, error, meta}` response envelope.

use reqwest::Response;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use super::{ApiError, GENERIC_FAILURE_MESSAGE};

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub meta: Option<PageMeta>,
}

/// Paging block on list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageMeta {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub count: Option<u64>,
    pub total: Option<u64>,
    #[serde(alias = "totalPages")]
    pub total_pages: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: Option<PageMeta>,
}

impl<T> Envelope<T> {
    fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
    }

    fn check(&self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected { message: self.failure_message() })
        }
    }

    pub fn into_data(self) -> Result<T, ApiError> {
        self.check()?;
        self.data
            .ok_or_else(|| ApiError::Decode("response carried no data".into()))
    }

    /// Success flag and message only; `data` is ignored.
    pub fn into_ack(self) -> Result<Option<String>, ApiError> {
        self.check()?;
        Ok(self.message)
    }
}

impl<T> Envelope<Vec<T>> {
    /// A missing `data` on a successful list call is an empty page.
    pub fn into_page(self) -> Result<Page<T>, ApiError> {
        self.check()?;
        Ok(Page { items: self.data.unwrap_or_default(), meta: self.meta })
    }
}

/// Read the whole body and parse it as JSON.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::Decode(format!("cannot read body: {e}")))?;
    trace!(body = %String::from_utf8_lossy(&bytes), "response payload");
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}
