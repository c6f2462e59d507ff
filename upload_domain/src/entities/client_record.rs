// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Client Record
//!
//! Tracks a client's allotted and currently-used share of the global rate
//! budget. One record per client, created on first upload and updated by
//! the rate limiter's tick as its active uploads' allowances change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::ClientId;
use crate::UploadError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    client_id: ClientId,
    allotted_rate_kb: u32,
    active_upload_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClientRecord {
    pub fn new(client_id: ClientId, allotted_rate_kb: u32) -> Self {
        let now = Utc::now();
        Self {
            client_id,
            allotted_rate_kb,
            active_upload_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_parts(
        client_id: ClientId,
        allotted_rate_kb: u32,
        active_upload_count: u32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id,
            allotted_rate_kb,
            active_upload_count,
            created_at,
            updated_at,
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn allotted_rate_kb(&self) -> u32 {
        self.allotted_rate_kb
    }

    pub fn active_upload_count(&self) -> u32 {
        self.active_upload_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_allotted_rate_kb(&mut self, rate_kb: u32, maximum_rate_per_client_kb: u32) -> Result<(), UploadError> {
        if rate_kb > maximum_rate_per_client_kb {
            return Err(UploadError::IncorrectRequest(format!(
                "requested rate {}KB/s exceeds maximum {}KB/s",
                rate_kb, maximum_rate_per_client_kb
            )));
        }
        self.allotted_rate_kb = rate_kb;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn register_upload_started(&mut self) {
        self.active_upload_count += 1;
        self.updated_at = Utc::now();
    }

    pub fn register_upload_ended(&mut self) {
        self.active_upload_count = self.active_upload_count.saturating_sub(1);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_allotted_rate_enforces_client_maximum() {
        let mut record = ClientRecord::new(ClientId::new(), 1024);
        assert!(record.set_allotted_rate_kb(20_000, 10_240).is_err());
        record.set_allotted_rate_kb(5_000, 10_240).unwrap();
        assert_eq!(record.allotted_rate_kb(), 5_000);
    }

    #[test]
    fn active_upload_count_never_underflows() {
        let mut record = ClientRecord::new(ClientId::new(), 1024);
        record.register_upload_ended();
        assert_eq!(record.active_upload_count(), 0);
    }
}
