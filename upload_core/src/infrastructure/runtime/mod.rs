// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime
//!
//! The three pieces that turn the domain's plain-data entities into a
//! running service: a demand-created per-file control-block registry, the
//! tick-based rate limiter that assigns those control blocks their byte
//! allowance, and the async chunk processor that consumes it.

pub mod chunk_processor;
pub mod config_registry;
pub mod rate_limiter;

pub use chunk_processor::{ChunkProcessor, CompletionListener};
pub use config_registry::{ConfigRegistry, UploadControlBlock};
pub use rate_limiter::RateLimiterScheduler;
