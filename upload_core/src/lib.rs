// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Upload Core
//!
//! A resumable, rate-limited, CRC-verified large-file upload service.
//! Clients prepare an upload, stream it in as one or more chunks, and may
//! pause, resume, or cancel at any point; a background scheduler enforces
//! per-request, per-client, and process-wide rate caps on a fixed tick.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  UploadOrchestrator: prepare / chunk / pause / resume /      │
//! │  cancel / rate-change / progress / config / reconciliation   │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                          │
//! │  runtime: ConfigRegistry, RateLimiterScheduler, ChunkProcessor│
//! │  repositories: SqliteStateStore over sqlx                    │
//! │  config / logging / metrics: layered config, tracing, prometheus │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `upload_domain` (a separate crate) owns everything above this layer that
//! doesn't touch I/O or scheduling: `FileRecord`, `ClientRecord`, the CRC
//! engine, the rate limiter's value objects, and the `StateStoreRepository`
//! port this crate implements.
//!
//! ## Core Concepts
//!
//! ### File records
//! Each upload is a `FileRecord` moving through `Prepared -> Receiving ->
//! Complete`, with `Paused` and `Disconnected` side branches and `Cancelled`
//! as a terminal state reachable from anywhere. `crced_bytes` tracks the
//! verified prefix; `completion_in_bytes` tracks what's been written to disk
//! but not yet CRC-checked — the gap between the two is what disconnect
//! reconciliation closes.
//!
//! ### Rate limiting
//! `RateLimiterScheduler` recomputes every active upload's byte allowance on
//! a fixed tick: a per-request base credit, scaled down first against the
//! client's cap, then against the process-wide cap, floored at a minimum.
//! `ChunkProcessor` parks on the allowance (and on pause) via `tokio::sync::Notify`
//! rather than polling.
//!
//! ### Chunk processing
//! `ChunkProcessor::process` drives one inbound chunk end to end: read a
//! rate-limited burst, update a running CRC, append to the file, repeat
//! until EOF, then either commit (CRC matches) or roll back to the last
//! known-good offset (CRC mismatch). Outcomes reach the caller only through
//! a `CompletionListener`, never as a `Result` from `process` itself.
//!
//! ## Error Handling
//!
//! Every layer shares `upload_domain::UploadError`, a `thiserror` enum
//! covering both the client-facing request taxonomy (missing parameter,
//! incorrect request, CRC mismatch, stream disconnect, cancellation) and the
//! ambient infrastructure categories (I/O, persistence, serialization,
//! resource exhaustion, timeout, internal).
//!
//! ## Observability
//!
//! Structured logging via `tracing`, initialized by
//! `infrastructure::logging::init_tracing`; process metrics via
//! `prometheus`, collected in `infrastructure::metrics::UploadMetrics`.
//!
//! ## Testing
//!
//! Unit tests live alongside their modules in `#[cfg(test)]` blocks.
//! Integration tests covering full upload scenarios live under `tests/`.

pub mod application;
pub mod infrastructure;

pub use application::{DefaultUploadOrchestrator, UploadConfigSnapshot, UploadOrchestrator};
pub use infrastructure::{SqliteStateStore, UploadCoreConfig, UploadMetrics};
pub use infrastructure::runtime::{ChunkProcessor, CompletionListener, ConfigRegistry, RateLimiterScheduler};

pub use upload_domain::{
    ClientId, ClientRecord, Crc32Digest, CrcEngine, ErrorCategory, FileId, FileRecord, IncrementalCrc,
    RateLimiterConfig, StateStoreRepository, UploadError, UploadProcessingConfiguration, UploadState,
};
