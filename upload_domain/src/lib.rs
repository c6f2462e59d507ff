// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Domain
//!
//! Pure business logic for the resumable upload core: entities, value
//! objects, the domain error taxonomy, and the two ports (`StateStoreRepository`,
//! by way of `CrcEngine`'s pure computation) that `upload_core` implements
//! and drives. Nothing in this crate performs I/O, spawns a task, or knows
//! about rate limiting's tick-based scheduling — that's `upload_core`'s job.
//!
//! ## Layout
//!
//! - `entities` — `FileRecord` (durable per-upload state), `ClientRecord`
//!   (per-client rate budget), `UploadProcessingConfiguration` (ephemeral
//!   per-tick snapshot).
//! - `value_objects` — `FileId`, `ClientId`, `Crc32Digest`, `RateLimiterConfig`.
//! - `services` — `CrcEngine` / `IncrementalCrc`, the pure checksum
//!   computation shared by chunk validation and disconnect reconciliation.
//! - `repositories` — `StateStoreRepository`, the persistence port
//!   `upload_core::infrastructure` implements over `sqlx`.
//! - `error` — `UploadError`, the single error type used across every layer.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{ClientRecord, FileRecord, UploadProcessingConfiguration, UploadState};
pub use error::{ErrorCategory, UploadError};
pub use repositories::StateStoreRepository;
pub use services::{CrcEngine, IncrementalCrc};
pub use value_objects::{ClientId, Crc32Digest, FileId, GenericId, IdCategory, RateLimiterConfig};
