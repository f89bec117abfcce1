//! Exeloka dashboard client.
//!
//! [`client::ApiClient`] owns the HTTP pool, the auth [`session`] and the
//! single-flight refresh interceptor; [`api`] layers typed resource facades
//! on top. [`legacy`] talks to the older `*.php` endpoints with a fixture
//! fallback, and [`insight`] is the offline category rule table.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod insight;
#[cfg(feature = "legacy")]
pub mod legacy;
pub mod logger;
pub mod session;

pub use client::{ApiClient, ApiError, ClientEvent};
pub use error::AppError;
