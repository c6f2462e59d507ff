// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration
//!
//! CLI-facing application configuration, distinct from
//! `upload_core::infrastructure::config::UploadCoreConfig` (the layered,
//! file-and-env-backed runtime configuration for the rate limiter, CRC
//! engine, and state store). This type holds only what the bootstrap phase
//! needs before the application proper starts: logging verbosity and the
//! command's path arguments.

use std::fmt;
use std::path::PathBuf;

/// Logging verbosity, translated to a `tracing` level at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Bootstrap-phase application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub log_level: LogLevel,
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
    pub dry_run: bool,
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// Builder for `AppConfig`, mirroring the validation flow `SecureArgParser`
/// feeds it from: every setter takes an already-validated value, so
/// `build()` itself never fails on anything but missing required fields.
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    app_name: Option<String>,
    log_level: LogLevel,
    config_path: Option<PathBuf>,
    verbose: bool,
    dry_run: bool,
}

impl AppConfigBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Build with a default app name when none was set; infallible.
    pub fn build(self) -> AppConfig {
        AppConfig {
            app_name: self.app_name.unwrap_or_else(|| "upload-core".to_string()),
            log_level: self.log_level,
            config_path: self.config_path,
            verbose: self.verbose,
            dry_run: self.dry_run,
        }
    }

    /// Build, requiring an app name to have been set explicitly.
    pub fn try_build(self) -> Result<AppConfig, String> {
        let app_name = self.app_name.ok_or_else(|| "app_name is required".to_string())?;
        Ok(AppConfig {
            app_name,
            log_level: self.log_level,
            config_path: self.config_path,
            verbose: self.verbose,
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_app_name_when_unset() {
        let config = AppConfig::builder().build();
        assert_eq!(config.app_name, "upload-core");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn try_build_requires_app_name() {
        let result = AppConfig::builder().verbose(true).try_build();
        assert!(result.is_err());
    }

    #[test]
    fn try_build_succeeds_with_app_name() {
        let config = AppConfig::builder()
            .app_name("upload-core")
            .log_level(LogLevel::Debug)
            .try_build()
            .unwrap();
        assert_eq!(config.app_name, "upload-core");
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("bogus".parse::<LogLevel>().is_err());
    }
}
