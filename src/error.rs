//! Error categories surfaced by the services and rendered by the HTTP layer.
//!
//! Every failure carries a stable `code` plus a human readable message. Verification
//! failures also carry the matcher confidence so the caller can explain the rejection.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::photo::PhotoStorageError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The request is well formed but the employee is not ready for it yet.
    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Unauthorized { message: String, confidence: f64 },

    /// Photo storage rejected the call or is not configured.
    #[error("{message}")]
    Upstream { message: String, misconfigured: bool },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Unauthorized { .. } => "UNAUTHORIZED",
            AppError::Upstream { .. } => "UPSTREAM_FAILURE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            AppError::Unauthorized { confidence, .. } => Some(*confidence),
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Upstream { misconfigured: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        });

        if let Some(confidence) = self.confidence() {
            body["confidence"] = json!(confidence);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::Conflict("Resource already exists".into()),
            StoreError::NotFound => AppError::NotFound("Record not found".into()),
            StoreError::CapacityExceeded { max } => {
                AppError::Validation(format!("Maximum {max} face images allowed"))
            }
            StoreError::Database(e) => {
                error!(error = %e, "Database error");
                AppError::Internal("Internal Server Error".into())
            }
        }
    }
}

impl From<PhotoStorageError> for AppError {
    fn from(e: PhotoStorageError) -> Self {
        match e {
            PhotoStorageError::InvalidImage(_) | PhotoStorageError::InvalidReference(_) => {
                AppError::Validation(e.to_string())
            }
            PhotoStorageError::NotConfigured(_) => {
                error!(error = %e, "Photo storage is not configured");
                AppError::Upstream {
                    message: "Failed to upload photos to cloud storage. Please check the storage configuration."
                        .into(),
                    misconfigured: true,
                }
            }
            PhotoStorageError::Upstream(_) => {
                error!(error = %e, "Photo storage request failed");
                AppError::Upstream {
                    message: "Photo storage is unavailable. Please try again later.".into(),
                    misconfigured: false,
                }
            }
        }
    }
}
