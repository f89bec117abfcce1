//! Request descriptions that can be sent more than once.
//!
//! The refresh interceptor replays a request after rotating the token, so a
//! [`PendingRequest`] keeps its body as plain data and builds the reqwest
//! body on every dispatch. `reqwest::multipart::Form` is consumed by `send`,
//! hence [`MultipartForm`].

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use uuid::Uuid;

use super::ApiError;

#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

#[derive(Debug, Clone)]
enum FormPart {
    Text(String),
    File { filename: String, mime: Option<String>, bytes: Vec<u8> },
}

/// Rebuildable `multipart/form-data` body.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<(String, FormPart)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                filename: filename.into(),
                mime: mime.map(str::to_string),
                bytes,
            },
        ));
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Value of the first text part called `name`.
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|(n, part)| match part {
            FormPart::Text(v) if n == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// `(filename, mime, bytes)` of the first file part called `name`.
    pub fn file_part(&self, name: &str) -> Option<(&str, Option<&str>, &[u8])> {
        self.parts.iter().find_map(|(n, part)| match part {
            FormPart::File { filename, mime, bytes } if n == name => {
                Some((filename.as_str(), mime.as_deref(), bytes.as_slice()))
            }
            _ => None,
        })
    }

    pub(crate) fn build(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, part) in &self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name.clone(), value.clone()),
                FormPart::File { filename, mime, bytes } => {
                    let mut file = Part::bytes(bytes.clone()).file_name(filename.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| {
                            ApiError::InvalidRequest(format!("bad mime type '{mime}': {e}"))
                        })?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// One logical API call.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Correlates log lines of the original send and its replay.
    pub(crate) id: Uuid,
    pub method: Method,
    /// Path relative to the API base, e.g. `/recommendations/projects`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    /// Set once the interceptor has replayed this request.
    pub(crate) retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(value)
            .map_err(|e| ApiError::InvalidRequest(format!("cannot encode body: {e}")))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn with_multipart(mut self, form: MultipartForm) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query pair only when `value` is present.
    pub fn with_optional_query<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_query(key, v),
            None => self,
        }
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}
