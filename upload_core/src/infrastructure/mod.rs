// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Adapters around the domain's ports: configuration loading, logging and
//! metrics setup, the SQLite-backed state store, and the runtime pieces
//! (rate limiter, per-file control-block registry, chunk processor) that
//! drive the domain entities against real I/O and the system clock.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod repositories;
pub mod runtime;

pub use config::UploadCoreConfig;
pub use metrics::UploadMetrics;
pub use repositories::SqliteStateStore;
