// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secure Argument Validation
//!
//! Validation primitives shared by every CLI command: length limits,
//! dangerous-pattern rejection (path traversal, shell metacharacters),
//! protected-directory checks, and generic numeric range checks. None of
//! this is upload-domain-specific — it's the same hardening any CLI that
//! accepts filesystem paths from an untrusted caller needs.

use std::fmt;
use std::path::{Path, PathBuf};

/// Upper bound on the number of raw CLI arguments accepted.
pub const MAX_ARG_COUNT: usize = 100;

/// Upper bound on the length of any single argument string.
pub const MAX_ARG_LENGTH: usize = 1000;

/// Upper bound on a path argument's length.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Substrings that should never appear in a trusted argument: path
/// traversal, home-dir expansion, and shell metacharacters that would be
/// dangerous if this value were ever passed to a subshell.
const DANGEROUS_PATTERNS: &[&str] = &[
    "..", "~", "$", "`", ";", "&", "|", ">", "<", "\n", "\r", "\0",
];

/// System directories a file-path argument must never resolve into.
const PROTECTED_DIRS: &[&str] = &[
    "/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    TooManyArguments,
    ArgumentTooLong(String),
    DangerousPattern { pattern: String, arg: String },
    PathTooLong,
    ProtectedDirectory(String),
    PathNotFound(String),
    InvalidPath(String),
    MissingArgument(String),
    InvalidValue { arg: String, reason: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TooManyArguments => write!(f, "too many arguments (max {MAX_ARG_COUNT})"),
            ParseError::ArgumentTooLong(arg) => write!(f, "argument too long: {arg:.40}..."),
            ParseError::DangerousPattern { pattern, arg } => {
                write!(f, "argument '{arg}' contains disallowed pattern '{pattern}'")
            }
            ParseError::PathTooLong => write!(f, "path exceeds {MAX_PATH_LENGTH} bytes"),
            ParseError::ProtectedDirectory(dir) => write!(f, "refusing to operate under protected directory {dir}"),
            ParseError::PathNotFound(path) => write!(f, "path not found: {path}"),
            ParseError::InvalidPath(path) => write!(f, "invalid path: {path}"),
            ParseError::MissingArgument(arg) => write!(f, "missing required argument: {arg}"),
            ParseError::InvalidValue { arg, reason } => write!(f, "invalid value for {arg}: {reason}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Stateless validation functions applied to CLI arguments before they're
/// trusted anywhere else in the process.
pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a free-form string argument: length and dangerous-pattern
    /// checks only, no filesystem access. Use for values that aren't
    /// expected to be existing paths (output paths, names, identifiers).
    pub fn validate_argument(arg: &str) -> Result<(), ParseError> {
        if arg.len() > MAX_ARG_LENGTH {
            return Err(ParseError::ArgumentTooLong(arg.chars().take(40).collect()));
        }

        for pattern in DANGEROUS_PATTERNS {
            if arg.contains(pattern) {
                return Err(ParseError::DangerousPattern {
                    pattern: pattern.to_string(),
                    arg: arg.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validates a path argument that is expected to already exist:
    /// dangerous-pattern check, length check, canonicalization, and a
    /// protected-directory check on the canonical form.
    pub fn validate_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path)?;

        if path.len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }

        let canonical = std::fs::canonicalize(path).map_err(|_| ParseError::PathNotFound(path.to_string()))?;

        Self::check_protected_dir(&canonical)?;

        Ok(canonical)
    }

    /// Validates a path argument that may not exist yet (an output path,
    /// a database file about to be created): skips canonicalization but
    /// still checks the parent directory isn't protected.
    pub fn validate_optional_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path)?;

        if path.len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }

        let candidate = PathBuf::from(path);
        if let Some(parent) = candidate.parent() {
            if let Ok(canonical_parent) = std::fs::canonicalize(parent) {
                Self::check_protected_dir(&canonical_parent)?;
            }
        }

        Ok(candidate)
    }

    fn check_protected_dir(path: &Path) -> Result<(), ParseError> {
        let path_str = path.to_string_lossy();
        for protected in PROTECTED_DIRS {
            if path_str.starts_with(protected) {
                return Err(ParseError::ProtectedDirectory(protected.to_string()));
            }
        }
        Ok(())
    }

    /// Validates a numeric argument falls within `[min, max]`.
    pub fn validate_number<T>(arg_name: &str, value: T, min: T, max: T) -> Result<(), ParseError>
    where
        T: PartialOrd + fmt::Display,
    {
        if value < min || value > max {
            return Err(ParseError::InvalidValue {
                arg: arg_name.to_string(),
                reason: format!("must be between {min} and {max}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_traversal() {
        let result = SecureArgParser::validate_argument("../../etc/passwd");
        assert!(matches!(result, Err(ParseError::DangerousPattern { .. })));
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(SecureArgParser::validate_argument("foo; rm -rf /").is_err());
        assert!(SecureArgParser::validate_argument("foo`whoami`").is_err());
    }

    #[test]
    fn accepts_plain_identifiers() {
        assert!(SecureArgParser::validate_argument("upload-core.toml").is_ok());
        assert!(SecureArgParser::validate_argument("client-42").is_ok());
    }

    #[test]
    fn rejects_too_long_argument() {
        let long = "a".repeat(MAX_ARG_LENGTH + 1);
        assert!(matches!(
            SecureArgParser::validate_argument(&long),
            Err(ParseError::ArgumentTooLong(_))
        ));
    }

    #[test]
    fn validate_path_rejects_missing_file() {
        let result = SecureArgParser::validate_path("/no/such/path/ever");
        assert!(matches!(result, Err(ParseError::PathNotFound(_))));
    }

    #[test]
    fn validate_path_rejects_protected_directory() {
        let result = SecureArgParser::validate_path("/etc");
        assert!(matches!(result, Err(ParseError::ProtectedDirectory(_))));
    }

    #[test]
    fn validate_number_enforces_range() {
        assert!(SecureArgParser::validate_number("workers", 4u32, 1, 128).is_ok());
        assert!(SecureArgParser::validate_number("workers", 0u32, 1, 128).is_err());
        assert!(SecureArgParser::validate_number("workers", 200u32, 1, 128).is_err());
    }
}
