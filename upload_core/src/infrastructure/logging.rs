// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Logging
//!
//! Structured logging setup for the upload core, built on `tracing` +
//! `tracing-subscriber`. Every chunk-processor and rate-limiter log line
//! carries `file_id` (and `client_id` where relevant) as a span field so a
//! single upload's lifecycle can be filtered out of a busy server's log
//! stream.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Initializes the global `tracing` subscriber. Call once, early in `main`.
///
/// Respects `RUST_LOG`; falls back to `info` for this crate and `warn`
/// elsewhere when unset. Safe to call more than once in tests — later calls
/// are no-ops reported as `Err`, which callers are expected to ignore.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,upload_core=info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    Registry::default().with(filter).with(fmt_layer).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_does_not_panic_on_repeated_calls() {
        let _ = init_tracing();
        let _ = init_tracing();
    }
}
