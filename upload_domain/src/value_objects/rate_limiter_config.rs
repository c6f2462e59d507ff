// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rate Limiter Configuration
//!
//! The bounds the tick-based token-bucket scheduler enforces, in KB/s. The
//! defaults below are the ones named in the system's design: a single
//! request starts at 1 MB/s, never below 1 KB/s; a client tops out at
//! 10 MB/s; the whole process never hands out more than 10 MB/s in total
//! across every active upload.

use serde::{Deserialize, Serialize};

use crate::UploadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    default_rate_per_request_kb: u32,
    minimum_rate_per_request_kb: u32,
    default_rate_per_client_kb: u32,
    maximum_rate_per_client_kb: u32,
    maximum_overall_rate_kb: u32,
}

impl RateLimiterConfig {
    pub fn new(
        default_rate_per_request_kb: u32,
        minimum_rate_per_request_kb: u32,
        default_rate_per_client_kb: u32,
        maximum_rate_per_client_kb: u32,
        maximum_overall_rate_kb: u32,
    ) -> Result<Self, UploadError> {
        if minimum_rate_per_request_kb == 0 {
            return Err(UploadError::InvalidConfiguration(
                "minimum_rate_per_request_kb must be at least 1".into(),
            ));
        }
        if default_rate_per_request_kb < minimum_rate_per_request_kb {
            return Err(UploadError::InvalidConfiguration(
                "default_rate_per_request_kb must be >= minimum_rate_per_request_kb".into(),
            ));
        }
        if default_rate_per_client_kb > maximum_rate_per_client_kb {
            return Err(UploadError::InvalidConfiguration(
                "default_rate_per_client_kb must be <= maximum_rate_per_client_kb".into(),
            ));
        }
        if maximum_rate_per_client_kb > maximum_overall_rate_kb {
            return Err(UploadError::InvalidConfiguration(
                "maximum_rate_per_client_kb must be <= maximum_overall_rate_kb".into(),
            ));
        }
        Ok(Self {
            default_rate_per_request_kb,
            minimum_rate_per_request_kb,
            default_rate_per_client_kb,
            maximum_rate_per_client_kb,
            maximum_overall_rate_kb,
        })
    }

    pub fn default_rate_per_request_kb(&self) -> u32 {
        self.default_rate_per_request_kb
    }

    pub fn minimum_rate_per_request_kb(&self) -> u32 {
        self.minimum_rate_per_request_kb
    }

    pub fn default_rate_per_client_kb(&self) -> u32 {
        self.default_rate_per_client_kb
    }

    pub fn maximum_rate_per_client_kb(&self) -> u32 {
        self.maximum_rate_per_client_kb
    }

    pub fn maximum_overall_rate_kb(&self) -> u32 {
        self.maximum_overall_rate_kb
    }

    pub fn maximum_overall_rate_bytes_per_sec(&self) -> u64 {
        self.maximum_overall_rate_kb as u64 * 1024
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            default_rate_per_request_kb: 1024,
            minimum_rate_per_request_kb: 1,
            default_rate_per_client_kb: 10240,
            maximum_rate_per_client_kb: 10240,
            maximum_overall_rate_kb: 10240,
        }
    }
}
