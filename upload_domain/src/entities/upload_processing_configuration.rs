// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Processing Configuration
//!
//! A snapshot of one file's ephemeral, per-tick rate-limiter state: the rate
//! it's asking for, the byte allowance the current tick handed it, and
//! whether it's paused or cancelled. The runtime registry that actually
//! drives the tick loop (`upload_core::infrastructure::runtime::config_registry`)
//! keeps the live, atomically-mutated version of this data; this type is
//! the plain-data value handed across the boundary when a snapshot is
//! needed (e.g. for `get_config`, or to persist a rate change request).

use serde::{Deserialize, Serialize};

use crate::value_objects::FileId;
use crate::UploadError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProcessingConfiguration {
    file_id: FileId,
    desired_rate_kb: u32,
    current_allowance_bytes: u64,
    paused: bool,
    cancel_requested: bool,
}

impl UploadProcessingConfiguration {
    pub fn new(file_id: FileId, desired_rate_kb: u32) -> Self {
        Self {
            file_id,
            desired_rate_kb,
            current_allowance_bytes: 0,
            paused: false,
            cancel_requested: false,
        }
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn desired_rate_kb(&self) -> u32 {
        self.desired_rate_kb
    }

    pub fn current_allowance_bytes(&self) -> u64 {
        self.current_allowance_bytes
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn set_desired_rate_kb(
        &mut self,
        rate_kb: u32,
        minimum_rate_per_request_kb: u32,
    ) -> Result<(), UploadError> {
        if rate_kb < minimum_rate_per_request_kb {
            return Err(UploadError::IncorrectRequest(format!(
                "requested rate {}KB/s is below the minimum {}KB/s",
                rate_kb, minimum_rate_per_request_kb
            )));
        }
        self.desired_rate_kb = rate_kb;
        Ok(())
    }

    pub fn set_current_allowance_bytes(&mut self, bytes: u64) {
        self.current_allowance_bytes = bytes;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_rate_below_minimum() {
        let mut config = UploadProcessingConfiguration::new(FileId::new(), 1024);
        assert!(config.set_desired_rate_kb(0, 1).is_err());
        config.set_desired_rate_kb(2, 1).unwrap();
        assert_eq!(config.desired_rate_kb(), 2);
    }
}
