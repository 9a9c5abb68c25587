//! Tagged operation responses
//!
//! Every mutating operation resolves to a success/error response with a
//! human-readable message. Typed errors are mapped to user-safe text here;
//! internal failure detail never crosses the boundary (it is logged instead
//! and reported as a generic retryable message).

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::StoreError;

/// Operation outcome surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
    Success { message: String },
    Error { message: String },
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        ApiResponse::Success {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ApiResponse::Success { message } | ApiResponse::Error { message } => message,
        }
    }
}

/// Generic message for failures the caller cannot act on
pub const GENERIC_FAILURE: &str = "An unexpected error occurred, please try again";

/// Map a typed error to a user-safe message.
pub fn user_message(error: &StoreError) -> String {
    match error {
        StoreError::NotFound(_) => "The requested item no longer exists".to_string(),
        StoreError::Unauthorized(_) => "You are not allowed to modify this course".to_string(),
        // Denied carries the protection collaborator's user-facing text
        StoreError::Denied(message) => message.clone(),
        StoreError::ScopeMismatch { .. } => {
            "Some items no longer belong to this section, please refresh and try again".to_string()
        }
        StoreError::IncompleteSet(_) => {
            "The order you submitted is out of date, please refresh and try again".to_string()
        }
        StoreError::ConcurrentModification(_) => {
            "This section was changed by someone else, please refresh and try again".to_string()
        }
        StoreError::InvalidInput(_) => "Invalid data".to_string(),
        StoreError::Io(_) | StoreError::Json(_) | StoreError::Internal(_) => {
            GENERIC_FAILURE.to_string()
        }
    }
}

/// Wrap a service result into a tagged response.
///
/// Internal-class failures are logged with full detail; the caller only sees
/// the generic retry message.
pub fn from_result<T>(result: Result<T, StoreError>, success_message: &str) -> ApiResponse {
    match result {
        Ok(_) => ApiResponse::success(success_message),
        Err(e) => {
            if matches!(
                e,
                StoreError::Io(_) | StoreError::Json(_) | StoreError::Internal(_)
            ) {
                error!(error = %e, "Operation failed");
            }
            ApiResponse::error(user_message(&e))
        }
    }
}
