//! Typed error type for the store crate.

use std::time::Duration;

use thiserror::Error;

use crate::Collection;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{collection} document not found: {id}")]
    NotFound { collection: Collection, id: String },

    #[error("document {id} in {collection} has an invalid shape: {reason}")]
    InvalidDocument {
        collection: Collection,
        id: String,
        reason: String,
    },

    /// The backing document store rejected or failed the call.
    #[error("document store error: {0}")]
    Backend(String),

    /// The call did not complete before its deadline. The write may still land.
    #[error("timed out after {after:?} during {operation}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}
