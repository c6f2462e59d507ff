// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions.
//!
//! Unlike a generic bootstrap layer, this crate's caller always fails with
//! a typed `upload_domain::UploadError`, never an arbitrary
//! `dyn std::error::Error`. `map_error_to_exit_code` switches on the error's
//! `ErrorCategory` instead of sniffing its `Display` string, so the mapping
//! can't drift out of sync with new error variants the way string matching
//! would.

use std::fmt;

use upload_domain::{ErrorCategory, UploadError};

/// Exit codes following Unix conventions (BSD sysexits.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error (1)
    Error = 1,

    /// Command line usage error (64)
    UsageError = 64,

    /// Data format error (65)
    DataError = 65,

    /// Cannot open input (66)
    NoInput = 66,

    /// Service unavailable (69)
    Unavailable = 69,

    /// Internal software error (70)
    Software = 70,

    /// I/O error (74)
    IoError = 74,

    /// Temporary failure, retry (75)
    TempFail = 75,

    /// Permission denied (77)
    NoPerm = 77,

    /// Configuration error (78)
    Config = 78,

    /// Interrupted by signal (SIGINT - Ctrl+C) (130)
    Interrupted = 130,

    /// Terminated by signal (SIGTERM) (143)
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Best-effort mapping from an arbitrary error's `Display` text, kept
    /// around for errors that don't carry an `ErrorCategory` (clap parse
    /// failures, I/O errors surfaced before an `UploadError` is even
    /// constructed). Prefer `map_error_to_exit_code` wherever a typed
    /// `UploadError` is available.
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let error_string = error.to_string().to_lowercase();

        if error_string.contains("permission") || error_string.contains("access denied") {
            ExitCode::NoPerm
        } else if error_string.contains("not found") || error_string.contains("no such") {
            ExitCode::NoInput
        } else if error_string.contains("invalid") || error_string.contains("argument") {
            ExitCode::UsageError
        } else if error_string.contains("parse") || error_string.contains("format") {
            ExitCode::DataError
        } else if error_string.contains("io") || error_string.contains("read") || error_string.contains("write") {
            ExitCode::IoError
        } else if error_string.contains("config") {
            ExitCode::Config
        } else if error_string.contains("unavailable") || error_string.contains("not available") {
            ExitCode::Unavailable
        } else {
            ExitCode::Error
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::DataError => "Data format error",
            ExitCode::NoInput => "Cannot open input",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::Software => "Internal software error",
            ExitCode::IoError => "I/O error",
            ExitCode::TempFail => "Temporary failure, retry",
            ExitCode::NoPerm => "Permission denied",
            ExitCode::Config => "Configuration error",
            ExitCode::Interrupted => "Interrupted by signal (SIGINT)",
            ExitCode::Terminated => "Terminated by signal (SIGTERM)",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn is_error(self) -> bool {
        !self.is_success()
    }

    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted | ExitCode::Terminated)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

/// Maps an `UploadError` to an exit code via its `ErrorCategory`, rather
/// than matching on its `Display` text.
pub fn map_error_to_exit_code(error: &UploadError) -> ExitCode {
    match error.category() {
        ErrorCategory::ClientRequest => ExitCode::UsageError,
        ErrorCategory::Integrity => ExitCode::DataError,
        ErrorCategory::Lifecycle => ExitCode::TempFail,
        ErrorCategory::NotFound => ExitCode::NoInput,
        ErrorCategory::Configuration => ExitCode::Config,
        ErrorCategory::Io => ExitCode::IoError,
        ErrorCategory::Persistence => ExitCode::Software,
        ErrorCategory::Serialization => ExitCode::DataError,
        ErrorCategory::Resource => ExitCode::Unavailable,
        ErrorCategory::Timeout => ExitCode::TempFail,
        ErrorCategory::Internal => ExitCode::Software,
    }
}

/// Convenience for a `main` that returns `Result<(), UploadError>`: success
/// maps to `ExitCode::Success`, failure is logged and mapped via
/// `map_error_to_exit_code`.
pub fn result_to_exit_code<T>(result: Result<T, UploadError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, category = %e.category(), "command failed");
            map_error_to_exit_code(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values_match_sysexits() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::UsageError.as_i32(), 64);
        assert_eq!(ExitCode::Config.as_i32(), 78);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
        assert_eq!(ExitCode::Terminated.as_i32(), 143);
    }

    #[test]
    fn map_error_to_exit_code_covers_client_and_integrity_errors() {
        assert_eq!(
            map_error_to_exit_code(&UploadError::missing_parameter("file_id")),
            ExitCode::UsageError
        );
        assert_eq!(
            map_error_to_exit_code(&UploadError::InvalidCrc {
                file_id: "f1".into(),
                expected: "deadbeef".into(),
                computed: "cafebabe".into(),
            }),
            ExitCode::DataError
        );
        assert_eq!(
            map_error_to_exit_code(&UploadError::NotFound("f1".into())),
            ExitCode::NoInput
        );
        assert_eq!(
            map_error_to_exit_code(&UploadError::ResourceExhausted("rate".into())),
            ExitCode::Unavailable
        );
    }

    #[test]
    fn result_to_exit_code_maps_ok_and_err() {
        let ok: Result<(), UploadError> = Ok(());
        assert_eq!(result_to_exit_code(ok), ExitCode::Success);

        let err: Result<(), UploadError> = Err(UploadError::IoError("disk full".into()));
        assert_eq!(result_to_exit_code(err), ExitCode::IoError);
    }

    #[test]
    fn from_error_falls_back_to_string_sniffing() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        assert_eq!(ExitCode::from_error(&io_err), ExitCode::NoPerm);
    }
}
