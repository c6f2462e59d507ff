// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Error
//!
//! The single error type shared by every layer of the upload core. Variants
//! fall into two groups: the request-facing taxonomy a chunk-processing
//! client needs to react to (`MissingParameter`, `IncorrectRequest`,
//! `InvalidCrc`, `StreamDisconnected`, `Cancelled`), and the ambient
//! infrastructure categories every non-trivial service ends up needing
//! (`IoError`, `DatabaseError`, `SerializationError`, `ResourceExhausted`,
//! `TimeoutError`, `InternalError`).
//!
//! The async chunk processor (see `upload_core`) never returns this type
//! across its own API boundary — outcomes there reach callers exclusively
//! through a completion listener. `UploadError` is still the type used
//! internally by every component the processor calls into (state store,
//! rate limiter, CRC engine), and is the type returned by the orchestrator's
//! synchronous operations (`prepare`, `get_progress`, `pause`, ...).

use std::fmt;

use thiserror::Error;

/// Unified error type for the upload domain and its infrastructure adapters.
#[derive(Error, Debug)]
pub enum UploadError {
    /// A required request parameter was absent (spec taxonomy).
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// A request parameter was present but malformed or out of range (spec
    /// taxonomy): bad offset, non-positive size, unknown file id, and so on.
    #[error("incorrect request: {0}")]
    IncorrectRequest(String),

    /// A chunk's declared CRC did not match the CRC computed over its bytes.
    #[error("CRC mismatch for file {file_id}: expected {expected}, computed {computed}")]
    InvalidCrc {
        file_id: String,
        expected: String,
        computed: String,
    },

    /// The upload stream ended before the declared chunk length was read.
    #[error("stream disconnected for file {file_id} after {bytes_read} of {expected} bytes")]
    StreamDisconnected {
        file_id: String,
        bytes_read: u64,
        expected: u64,
    },

    /// The caller requested cancellation; processing stopped cooperatively.
    #[error("upload cancelled for file {0}")]
    Cancelled(String),

    /// A requested entity (file record, client record) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invariant violation in a value object or entity constructor.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Wrapped I/O failure (disk full, permission denied, path missing).
    #[error("I/O error: {0}")]
    IoError(String),

    /// Wrapped persistence failure from the state store.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// Wrapped (de)serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A semaphore, rate-limiter slot, or registry capacity was exhausted.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// An operation exceeded its allotted time budget (e.g. max pause).
    #[error("timeout: {0}")]
    TimeoutError(String),

    /// Catch-all for invariants that should be unreachable in practice.
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Broad category used for metrics labels and log fields; coarser than the
/// variant itself so dashboards don't explode into one series per file id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ClientRequest,
    Integrity,
    Lifecycle,
    NotFound,
    Configuration,
    Io,
    Persistence,
    Serialization,
    Resource,
    Timeout,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::ClientRequest => "client_request",
            ErrorCategory::Integrity => "integrity",
            ErrorCategory::Lifecycle => "lifecycle",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Io => "io",
            ErrorCategory::Persistence => "persistence",
            ErrorCategory::Serialization => "serialization",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl UploadError {
    /// Category used for metrics labelling and structured log fields.
    pub fn category(&self) -> ErrorCategory {
        match self {
            UploadError::MissingParameter(_) | UploadError::IncorrectRequest(_) => {
                ErrorCategory::ClientRequest
            }
            UploadError::InvalidCrc { .. } => ErrorCategory::Integrity,
            UploadError::StreamDisconnected { .. } | UploadError::Cancelled(_) => {
                ErrorCategory::Lifecycle
            }
            UploadError::NotFound(_) => ErrorCategory::NotFound,
            UploadError::InvalidConfiguration(_) => ErrorCategory::Configuration,
            UploadError::IoError(_) => ErrorCategory::Io,
            UploadError::DatabaseError(_) => ErrorCategory::Persistence,
            UploadError::SerializationError(_) => ErrorCategory::Serialization,
            UploadError::ResourceExhausted(_) => ErrorCategory::Resource,
            UploadError::TimeoutError(_) => ErrorCategory::Timeout,
            UploadError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether retrying the same request later has a chance of succeeding.
    /// Client-request errors and integrity failures are not recoverable
    /// without the client changing what it sends; resource exhaustion and
    /// timeouts usually are.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UploadError::ResourceExhausted(_)
                | UploadError::TimeoutError(_)
                | UploadError::StreamDisconnected { .. }
        )
    }

    pub fn missing_parameter(name: impl Into<String>) -> Self {
        UploadError::MissingParameter(name.into())
    }

    pub fn incorrect_request(detail: impl Into<String>) -> Self {
        UploadError::IncorrectRequest(detail.into())
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::IoError(err.to_string())
    }
}
