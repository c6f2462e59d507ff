// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CRC-32 Digest Value Object
//!
//! A validated, lowercase 8-hex-digit CRC-32 checksum. Parsing rejects
//! anything that isn't exactly 8 hex characters so a malformed checksum
//! fails fast at the request boundary rather than silently comparing
//! unequal to every real digest.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::UploadError;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crc32Digest(u32);

impl Crc32Digest {
    pub fn from_value(value: u32) -> Self {
        Self(value)
    }

    /// Parses an 8-character lowercase (or uppercase) hex digest.
    pub fn parse(s: &str) -> Result<Self, UploadError> {
        if s.len() != 8 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UploadError::IncorrectRequest(format!(
                "crc must be 8 hex digits, got {:?}",
                s
            )));
        }
        let value = u32::from_str_radix(s, 16)
            .map_err(|e| UploadError::IncorrectRequest(format!("invalid crc: {}", e)))?;
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Crc32Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_lowercase_eight_hex_digits() {
        let digest = Crc32Digest::from_value(0xDEAD_BEEF);
        assert_eq!(digest.to_string(), "deadbeef");
    }

    #[test]
    fn parses_round_trip() {
        let digest = Crc32Digest::from_value(0x0000_00ab);
        let parsed = Crc32Digest::parse(&digest.to_string()).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn rejects_short_or_non_hex_input() {
        assert!(Crc32Digest::parse("abc").is_err());
        assert!(Crc32Digest::parse("zzzzzzzz").is_err());
    }
}
