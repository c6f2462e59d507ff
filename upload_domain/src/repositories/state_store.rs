// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # State Store Repository Port
//!
//! The durable `fileId -> FileRecord` and `clientId -> ClientRecord` mapping
//! described in the design as the "state store": every mutation must be
//! durable before its caller is told it succeeded. This module only
//! declares the contract; `upload_core::infrastructure::repositories` holds
//! the `sqlx`-backed implementation so the domain stays free of any
//! particular storage technology.
//!
//! Callers are responsible for serializing mutations to a single `fileId`
//! (the "one processor per file" invariant in the design is enforced by the
//! runtime's per-file configuration registry, not by this trait) — a
//! `save_file` call here is a plain upsert, not a compare-and-swap.

use async_trait::async_trait;

use crate::entities::{ClientRecord, FileRecord};
use crate::value_objects::{ClientId, FileId};
use crate::UploadError;

#[async_trait]
pub trait StateStoreRepository: Send + Sync {
    /// Allocates a new file id and persists a `Prepared` record under a
    /// server-controlled storage path. Implementations choose the path
    /// (typically `{storage_dir}/{file_id}`); the domain never sees a
    /// client-supplied path.
    async fn create_file(
        &self,
        client_id: ClientId,
        original_name: String,
        original_size: u64,
    ) -> Result<FileRecord, UploadError>;

    async fn get_file(&self, file_id: FileId) -> Result<Option<FileRecord>, UploadError>;

    /// Persists the given record's current field values, replacing whatever
    /// was stored for its id. The durability barrier (fsync / transaction
    /// commit) must complete before this returns `Ok`.
    async fn save_file(&self, record: &FileRecord) -> Result<(), UploadError>;

    /// Deletes the record. Does not touch the on-disk upload file — the
    /// caller (orchestrator) deletes that separately so the two failure
    /// domains (metadata vs. file bytes) stay visible independently.
    async fn remove_file(&self, file_id: FileId) -> Result<(), UploadError>;

    async fn list_files_for_client(&self, client_id: ClientId) -> Result<Vec<FileRecord>, UploadError>;

    /// All records regardless of client; used for `getConfig` snapshots and
    /// the orphan-sweeping `gc` pass.
    async fn list_all_files(&self) -> Result<Vec<FileRecord>, UploadError>;

    /// Returns the existing client record, or creates one seeded with
    /// `default_rate_kb` if this is the client's first upload.
    async fn get_or_create_client(
        &self,
        client_id: ClientId,
        default_rate_kb: u32,
    ) -> Result<ClientRecord, UploadError>;

    async fn save_client(&self, record: &ClientRecord) -> Result<(), UploadError>;

    /// Wipes all persisted state. Test/admin use only.
    async fn clear(&self) -> Result<(), UploadError>;
}
