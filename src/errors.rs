//! Error types for the store crate.
//!
//! This module defines a unified error enumeration used across the object
//! model, the blob/commit stores, the workbench, and the request
//! dispatcher. It integrates with `thiserror` to provide rich `Display`
//! implementations and error source chaining where applicable.
//!
//! Notes:
//! - Each variant carries contextual details via its message payload.
//! - Variants map onto the response-code taxonomy in the protocol layer
//!   (`bad_request`, `not_found`, `verify_failed`, `invalid_index`,
//!   `invalid_value_type`, `store_timeout`, `internal`).

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the store crate.
pub enum StoreError {
    /// Malformed RPC payload or illegal state transition.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A repository, commit, or blob required by the operation is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Post-put verification observed a different key set than requested.
    #[error("Verification failed after put: {0}")]
    VerifyFailed(String),

    /// A query or put referenced a column outside the configured index set.
    #[error("The `{0}` column is not in the configured index set.")]
    InvalidIndex(String),

    /// A non-string value was supplied for an indexed attribute.
    #[error("Attribute `{0}` requires a string value.")]
    InvalidValueType(String),

    /// A per-call store timeout elapsed. Retryable.
    #[error("Store operation timed out after {0:?}")]
    StoreTimeout(std::time::Duration),

    /// A structure element failed to decode, or referenced an unknown link.
    #[error("Invalid structure element: {0}")]
    InvalidElement(String),

    /// Repository-level invariant violation (e.g. commit requested with no
    /// modified working object).
    #[error("Repository error: {0}")]
    Repository(String),

    /// I/O error from an underlying store backend.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `bincode` decoding failure reading a structure element.
    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// `bincode` encoding failure serializing a structure element.
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Database error from the `sea_orm`-backed persistent store.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Any other internal failure not covered by a more specific variant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        StoreError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        StoreError::BadRequest(msg.into())
    }

    pub fn invalid_index(column: impl Into<String>) -> Self {
        StoreError::InvalidIndex(column.into())
    }

    /// True if a client retrying the same request might succeed without any
    /// other change (currently only store timeouts).
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::StoreTimeout(_))
    }
}
