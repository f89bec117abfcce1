//! Application-wide error types.
//!
//! Client-level failures live in [`crate::client::ApiError`]; this enum wraps
//! them together with the startup concerns (config, logger, usage). Session
//! storage failures arrive as `ApiError::Storage`.

use thiserror::Error;

use crate::client::ApiError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("usage: {0}")]
    Usage(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::StorageError;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(!e.to_string().is_empty());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn storage_failure_arrives_through_api() {
        let storage = StorageError::Malformed {
            path: "session.json".into(),
            reason: "expected value".into(),
        };
        let e: AppError = ApiError::from(storage).into();
        assert!(matches!(e, AppError::Api(ApiError::Storage(_))));
        assert!(e.to_string().contains("malformed session.json"));
    }

    #[test]
    fn logger_error_display() {
        let e = AppError::Logger("already initialized".into());
        assert!(e.to_string().contains("already initialized"));
    }

    #[test]
    fn api_error_is_transparent() {
        let e: AppError = ApiError::AuthRequired.into();
        assert_eq!(e.to_string(), ApiError::AuthRequired.to_string());
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        // satisfies std::error::Error trait
        let _: &dyn Error = &e;
    }
}
