// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Core Configuration
//!
//! Runtime configuration for the three subsystems the core wires together:
//! where uploaded bytes and the SQLite state store live on disk, how often
//! the rate limiter ticks, and the two behaviors the spec leaves as open
//! questions (`max_pause_secs`, `delete_on_cancel`). Loaded the way the rest
//! of the stack loads settings: layered defaults, then a TOML file, then
//! environment variables, via the `config` crate.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use upload_domain::{RateLimiterConfig, UploadError};

/// Top-level configuration for the upload core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadCoreConfig {
    /// Directory under which each upload's bytes accumulate, one file per
    /// `FileId`. Created on startup if missing.
    pub storage_dir: PathBuf,

    /// SQLite connection URL for the state store, e.g.
    /// `sqlite://./upload_state.db`.
    pub database_url: String,

    /// Rate-limiter tick period, in milliseconds. The spec's worked example
    /// uses 1000ms; tests use shorter ticks to stay fast.
    pub tick_period_ms: u64,

    /// Byte-rate bounds enforced by the tick scheduler.
    pub rate_limiter: RateLimiterConfig,

    /// How long an `UploadProcessingConfiguration` may sit unaccessed in the
    /// registry before idle eviction reaps it (design note 4.4: 10 minutes).
    pub registry_idle_eviction_secs: u64,

    /// Open Question (spec §9): maximum time a chunk processor may sit
    /// parked on `paused` before it's abandoned. `None` means unbounded,
    /// matching the source's original (unbounded) behavior.
    pub max_pause_secs: Option<u64>,

    /// Open Question (spec §9): whether a cancelled upload's partial file is
    /// deleted immediately (this implementation's chosen policy) versus
    /// swept later. Kept configurable so a deployment can opt into deferred
    /// sweeping via the `gc` admin command instead.
    pub delete_on_cancel: bool,

    /// Read-burst buffer size used by the chunk processor, in bytes.
    pub read_buffer_size: usize,
}

impl Default for UploadCoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./upload_data"),
            database_url: "sqlite://./upload_state.db".to_string(),
            tick_period_ms: 1000,
            rate_limiter: RateLimiterConfig::default(),
            registry_idle_eviction_secs: 600,
            max_pause_secs: None,
            delete_on_cancel: true,
            read_buffer_size: 64 * 1024,
        }
    }
}

impl UploadCoreConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn registry_idle_eviction(&self) -> Duration {
        Duration::from_secs(self.registry_idle_eviction_secs)
    }

    pub fn max_pause(&self) -> Option<Duration> {
        self.max_pause_secs.map(Duration::from_secs)
    }

    /// Loads configuration by layering, in order: built-in defaults, an
    /// optional TOML file at `path`, then `UPLOAD_` prefixed environment
    /// variables (e.g. `UPLOAD_TICK_PERIOD_MS=500`). Mirrors the layering the
    /// rest of the corpus uses `config` for.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, UploadError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("storage_dir", defaults.storage_dir.to_string_lossy().to_string())
            .map_err(|e| UploadError::InvalidConfiguration(e.to_string()))?
            .set_default("database_url", defaults.database_url.clone())
            .map_err(|e| UploadError::InvalidConfiguration(e.to_string()))?
            .set_default("tick_period_ms", defaults.tick_period_ms)
            .map_err(|e| UploadError::InvalidConfiguration(e.to_string()))?
            .set_default("registry_idle_eviction_secs", defaults.registry_idle_eviction_secs)
            .map_err(|e| UploadError::InvalidConfiguration(e.to_string()))?
            .set_default("delete_on_cancel", defaults.delete_on_cancel)
            .map_err(|e| UploadError::InvalidConfiguration(e.to_string()))?
            .set_default("read_buffer_size", defaults.read_buffer_size as i64)
            .map_err(|e| UploadError::InvalidConfiguration(e.to_string()))?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("UPLOAD").separator("__"));

        let settled = builder
            .build()
            .map_err(|e| UploadError::InvalidConfiguration(e.to_string()))?;
        settled
            .try_deserialize()
            .map_err(|e| UploadError::InvalidConfiguration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = UploadCoreConfig::default();
        assert_eq!(cfg.tick_period(), Duration::from_millis(1000));
        assert!(cfg.max_pause().is_none());
        assert!(cfg.delete_on_cancel);
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let cfg = UploadCoreConfig::load(None).unwrap();
        assert_eq!(cfg.tick_period_ms, 1000);
        assert_eq!(cfg.registry_idle_eviction_secs, 600);
    }
}
