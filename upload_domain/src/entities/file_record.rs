// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Record
//!
//! The durable record of a single upload: what's been written, what's been
//! CRC-verified, and what lifecycle state the file is in. Everything here
//! is what the state store persists; the ephemeral per-tick bookkeeping
//! (current byte allowance, pause/cancel flags) lives in
//! `UploadProcessingConfiguration` and the runtime registry that wraps it,
//! not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ClientId, FileId};
use crate::UploadError;

/// Lifecycle states a `FileRecord` moves through. Transitions are one-way
/// except `Receiving <-> Paused`, which can alternate any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    /// `prepare` has been called; no bytes have been written yet.
    Prepared,
    /// A chunk processor is actively appending and CRC-checking bytes.
    Receiving,
    /// The client asked to pause; no appends happen until resumed.
    Paused,
    /// The stream ended before the declared chunk length was read.
    Disconnected,
    /// `crced_bytes == original_size`; the upload is done.
    Complete,
    /// The client cancelled; the file has been deleted.
    Cancelled,
}

impl UploadState {
    /// Whether a chunk processor may append bytes while in this state.
    pub fn accepts_writes(&self) -> bool {
        matches!(self, UploadState::Receiving)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Complete | UploadState::Cancelled)
    }
}

/// A single uploaded file's durable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    file_id: FileId,
    client_id: ClientId,
    original_name: String,
    storage_path: String,
    original_size: u64,
    crced_bytes: u64,
    completion_in_bytes: u64,
    state: UploadState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Creates a new record in the `Prepared` state. Fails if `original_size`
    /// is zero — an upload always has at least one byte to send.
    pub fn prepare(
        client_id: ClientId,
        original_name: impl Into<String>,
        storage_path: impl Into<String>,
        original_size: u64,
    ) -> Result<Self, UploadError> {
        let original_name = original_name.into();
        if original_size == 0 {
            return Err(UploadError::IncorrectRequest(
                "original_size must be greater than zero".into(),
            ));
        }
        if original_name.trim().is_empty() {
            return Err(UploadError::MissingParameter("name".into()));
        }
        let now = Utc::now();
        Ok(Self {
            file_id: FileId::new(),
            client_id,
            original_name,
            storage_path: storage_path.into(),
            original_size,
            crced_bytes: 0,
            completion_in_bytes: 0,
            state: UploadState::Prepared,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstructs a record from persisted columns. Used by the state
    /// store's row mapping; does not re-run `prepare`'s validation since a
    /// persisted row is assumed to already satisfy the invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        file_id: FileId,
        client_id: ClientId,
        original_name: String,
        storage_path: String,
        original_size: u64,
        crced_bytes: u64,
        completion_in_bytes: u64,
        state: UploadState,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_id,
            client_id,
            original_name,
            storage_path,
            original_size,
            crced_bytes,
            completion_in_bytes,
            state,
            created_at,
            updated_at,
        }
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    /// Used once by the state store right after `prepare`, to fill in a
    /// path derived from the freshly-allocated `file_id` (the id isn't known
    /// until `prepare` returns, so it can't be passed to `prepare` itself).
    pub fn set_storage_path(&mut self, path: impl Into<String>) {
        self.storage_path = path.into();
        self.touch();
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    pub fn crced_bytes(&self) -> u64 {
        self.crced_bytes
    }

    pub fn completion_in_bytes(&self) -> u64 {
        self.completion_in_bytes
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.original_size.saturating_sub(self.completion_in_bytes)
    }

    pub fn is_complete(&self) -> bool {
        self.completion_in_bytes >= self.original_size
    }

    /// Transitions into `Receiving`. Valid from `Prepared`, `Paused`, or
    /// `Disconnected` (resuming after a dropped stream re-enters receiving).
    pub fn start_receiving(&mut self) -> Result<(), UploadError> {
        match self.state {
            UploadState::Prepared | UploadState::Paused | UploadState::Disconnected => {
                self.state = UploadState::Receiving;
                self.touch();
                Ok(())
            }
            _ => Err(UploadError::IncorrectRequest(format!(
                "cannot start receiving from state {:?}",
                self.state
            ))),
        }
    }

    /// Advances `completion_in_bytes` as bytes land on disk, independent of
    /// CRC verification. Called after every buffered read/write inside a
    /// chunk, so between calls the file may temporarily hold bytes beyond
    /// `crced_bytes` that haven't been checked against the declared CRC yet
    /// (see `mark_crced_through_completion`, `rollback_completion_to_crced`).
    pub fn record_bytes_appended(&mut self, new_completion_in_bytes: u64) -> Result<(), UploadError> {
        if new_completion_in_bytes < self.completion_in_bytes {
            return Err(UploadError::IncorrectRequest(format!(
                "append would move completion_in_bytes backward: {} -> {}",
                self.completion_in_bytes, new_completion_in_bytes
            )));
        }
        if new_completion_in_bytes > self.original_size {
            return Err(UploadError::IncorrectRequest(format!(
                "append would exceed original_size {}: got {}",
                self.original_size, new_completion_in_bytes
            )));
        }
        self.completion_in_bytes = new_completion_in_bytes;
        self.touch();
        Ok(())
    }

    /// A chunk's CRC matched the client's declared digest at EOF: the whole
    /// `[0, completion_in_bytes)` prefix is now verified. Transitions to
    /// `Complete` once that prefix covers the full `original_size`.
    pub fn mark_crced_through_completion(&mut self) {
        self.crced_bytes = self.completion_in_bytes;
        if self.is_complete() {
            self.state = UploadState::Complete;
        }
        self.touch();
    }

    /// A chunk's CRC did not match (or a disconnect's gap failed
    /// reconciliation): discard the unverified tail by truncating
    /// `completion_in_bytes` back down to the last known-good `crced_bytes`.
    /// The caller is responsible for truncating the on-disk file to match.
    pub fn rollback_completion_to_crced(&mut self) {
        self.completion_in_bytes = self.crced_bytes;
        if !self.state.is_terminal() {
            self.state = UploadState::Receiving;
        }
        self.touch();
    }

    pub fn pause(&mut self) -> Result<(), UploadError> {
        if !matches!(self.state, UploadState::Receiving) {
            return Err(UploadError::IncorrectRequest(format!(
                "cannot pause from state {:?}",
                self.state
            )));
        }
        self.state = UploadState::Paused;
        self.touch();
        Ok(())
    }

    pub fn mark_disconnected(&mut self) {
        if !self.state.is_terminal() {
            self.state = UploadState::Disconnected;
            self.touch();
        }
    }

    pub fn cancel(&mut self) {
        self.state = UploadState::Cancelled;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared() -> FileRecord {
        FileRecord::prepare(ClientId::new(), "source.bin", "/tmp/upload.bin", 100).unwrap()
    }

    #[test]
    fn prepare_rejects_zero_size() {
        assert!(FileRecord::prepare(ClientId::new(), "source.bin", "/tmp/x", 0).is_err());
    }

    #[test]
    fn prepare_rejects_blank_name() {
        assert!(FileRecord::prepare(ClientId::new(), "   ", "/tmp/x", 10).is_err());
    }

    #[test]
    fn chunk_sequence_advances_state_to_complete() {
        let mut record = prepared();
        record.start_receiving().unwrap();
        record.record_bytes_appended(40).unwrap();
        record.mark_crced_through_completion();
        assert_eq!(record.state(), UploadState::Receiving);
        record.record_bytes_appended(100).unwrap();
        record.mark_crced_through_completion();
        assert_eq!(record.state(), UploadState::Complete);
        assert!(record.is_complete());
    }

    #[test]
    fn chunk_cannot_move_completion_backward_or_past_original_size() {
        let mut record = prepared();
        record.start_receiving().unwrap();
        record.record_bytes_appended(50).unwrap();
        assert!(record.record_bytes_appended(10).is_err());
        assert!(record.record_bytes_appended(1000).is_err());
    }

    #[test]
    fn disconnect_leaves_completion_ahead_of_crced_until_reconciled() {
        let mut record = prepared();
        record.start_receiving().unwrap();
        record.record_bytes_appended(60).unwrap();
        record.mark_crced_through_completion();
        record.record_bytes_appended(80).unwrap();
        record.mark_disconnected();
        assert_eq!(record.crced_bytes(), 60);
        assert_eq!(record.completion_in_bytes(), 80);

        record.start_receiving().unwrap();
        record.mark_crced_through_completion();
        assert_eq!(record.crced_bytes(), 80);
    }

    #[test]
    fn rollback_truncates_completion_back_to_crced() {
        let mut record = prepared();
        record.start_receiving().unwrap();
        record.record_bytes_appended(60).unwrap();
        record.mark_crced_through_completion();
        record.record_bytes_appended(90).unwrap();
        record.rollback_completion_to_crced();
        assert_eq!(record.completion_in_bytes(), 60);
        assert_eq!(record.crced_bytes(), 60);
        assert_eq!(record.state(), UploadState::Receiving);
    }

    #[test]
    fn pause_only_valid_while_receiving() {
        let mut record = prepared();
        assert!(record.pause().is_err());
        record.start_receiving().unwrap();
        record.pause().unwrap();
        assert_eq!(record.state(), UploadState::Paused);
    }

    #[test]
    fn cancel_is_valid_from_any_non_terminal_state() {
        let mut record = prepared();
        record.cancel();
        assert_eq!(record.state(), UploadState::Cancelled);
    }
}
