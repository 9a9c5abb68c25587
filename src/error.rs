//! Error types for course-store

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Request denied: {0}")]
    Denied(String),

    #[error("Scope mismatch: {child} does not belong to {parent}")]
    ScopeMismatch { child: String, parent: String },

    #[error("Incomplete sibling set: {0}")]
    IncompleteSet(String),

    #[error("Concurrent modification of {0}")]
    ConcurrentModification(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
