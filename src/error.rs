//! Unified application error types
//!
//! Provides a single error type for the entire application, convertible
//! into an HTTP response with an `ErrorResponse` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::analytics::AnalyticsError;
use crate::models::IngestError;
use crate::storage::StorageError;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Analytics over an empty window
    #[error("No data available")]
    Analytics(#[from] AnalyticsError),

    /// Rejected ingest payload
    #[error("{0}")]
    Ingest(#[from] IngestError),

    /// Requested resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Invalid request parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(String),

    /// File operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializable error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client-side handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl AppError {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Stable error code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(StorageError::NotFound(_)) => "NOT_FOUND",
            Self::Storage(StorageError::InvalidInput(_)) => "VALIDATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Analytics(_) => "NO_DATA",
            Self::Ingest(_) => "INVALID_PAYLOAD",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Storage(StorageError::NotFound(_)) | Self::Analytics(_) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Storage(StorageError::InvalidInput(_)) | Self::Ingest(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        err.to_response()
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_response().serialize(serializer)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::internal("something went wrong");
        assert_eq!(err.to_string(), "Internal error: something went wrong");
    }

    #[test]
    fn test_error_serialization() {
        let err = AppError::internal("test error");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("INTERNAL_ERROR"));
        assert!(json.contains("test error"));
    }

    #[test]
    fn test_empty_analytics_maps_to_404() {
        let err = AppError::from(AnalyticsError::EmptyReadings);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No data available");
        assert_eq!(err.code(), "NO_DATA");
    }

    #[test]
    fn test_ingest_error_maps_to_400() {
        let err = AppError::from(IngestError::InvalidFields(vec!["rpm", "maf"]));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing or invalid fields: rpm, maf");
    }

    #[test]
    fn test_storage_errors_status() {
        assert_eq!(
            AppError::from(StorageError::LockError).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(StorageError::NotFound("reading 1".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StorageError::InvalidInput("page".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_response_from_app_error() {
        let response = ErrorResponse::from(AppError::not_found("No sensor data found"));
        assert_eq!(response.code, "NOT_FOUND");
        assert_eq!(response.message, "No sensor data found");
    }
}
