// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite State Store
//!
//! The durable `StateStoreRepository` implementation: every mutation is a
//! single `INSERT`/`UPDATE` against the `files`/`clients` tables committed
//! before the call returns, so a caller's "success" can't precede the
//! durability barrier (design §4.2). `updateCrcedBytes`/`updateCompletion`
//! semantics live on `FileRecord` itself (upload_domain); this repository
//! just persists whatever record it's handed and maps rows back.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use upload_domain::{ClientId, ClientRecord, FileId, FileRecord, StateStoreRepository, UploadError, UploadState};

use crate::infrastructure::repositories::schema;

fn state_to_str(state: UploadState) -> &'static str {
    match state {
        UploadState::Prepared => "prepared",
        UploadState::Receiving => "receiving",
        UploadState::Paused => "paused",
        UploadState::Disconnected => "disconnected",
        UploadState::Complete => "complete",
        UploadState::Cancelled => "cancelled",
    }
}

fn state_from_str(s: &str) -> Option<UploadState> {
    match s {
        "prepared" => Some(UploadState::Prepared),
        "receiving" => Some(UploadState::Receiving),
        "paused" => Some(UploadState::Paused),
        "disconnected" => Some(UploadState::Disconnected),
        "complete" => Some(UploadState::Complete),
        "cancelled" => Some(UploadState::Cancelled),
        _ => None,
    }
}

/// `StateStoreRepository` backed by a SQLite database and a server-owned
/// storage directory for the uploaded bytes themselves.
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
    storage_dir: PathBuf,
}

impl SqliteStateStore {
    /// Connects to `database_url`, creating the database and running
    /// migrations if necessary, and ensures `storage_dir` exists.
    pub async fn connect(database_url: &str, storage_dir: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir)
            .map_err(|e| UploadError::IoError(format!("creating storage dir {:?}: {}", storage_dir, e)))?;

        schema::create_database_if_missing(database_url)
            .await
            .map_err(|e| UploadError::DatabaseError(e.to_string()))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| UploadError::DatabaseError(e.to_string()))?;
        schema::ensure_schema(&pool)
            .await
            .map_err(|e| UploadError::DatabaseError(e.to_string()))?;

        Ok(Self { pool, storage_dir })
    }

    /// Wraps an already-open pool; used by tests that share one in-memory
    /// database across multiple store handles.
    pub fn from_pool(pool: SqlitePool, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    #[allow(clippy::too_many_arguments)]
    fn row_to_file_record(
        file_id: String,
        client_id: String,
        original_name: String,
        storage_path: String,
        original_size: i64,
        crced_bytes: i64,
        completion_in_bytes: i64,
        state: String,
        created_at: String,
        updated_at: String,
    ) -> Result<FileRecord, UploadError> {
        let file_id = FileId::from_string(&file_id)?;
        let client_id = ClientId::from_string(&client_id)?;
        let state = state_from_str(&state)
            .ok_or_else(|| UploadError::SerializationError(format!("unknown upload state {:?}", state)))?;
        let created_at = DateTime::<Utc>::from_str(&created_at)
            .map_err(|e| UploadError::SerializationError(e.to_string()))?;
        let updated_at = DateTime::<Utc>::from_str(&updated_at)
            .map_err(|e| UploadError::SerializationError(e.to_string()))?;
        Ok(FileRecord::from_parts(
            file_id,
            client_id,
            original_name,
            storage_path,
            original_size as u64,
            crced_bytes as u64,
            completion_in_bytes as u64,
            state,
            created_at,
            updated_at,
        ))
    }
}

#[async_trait]
impl StateStoreRepository for SqliteStateStore {
    async fn create_file(
        &self,
        client_id: ClientId,
        original_name: String,
        original_size: u64,
    ) -> Result<FileRecord, UploadError> {
        // Placeholder path; `file_id` isn't known until `FileRecord::prepare`
        // allocates one, so the real path is filled in immediately after.
        let mut record = FileRecord::prepare(client_id, original_name.clone(), "", original_size)?;
        let storage_path = self
            .storage_dir
            .join(record.file_id().to_string())
            .to_string_lossy()
            .to_string();
        record.set_storage_path(storage_path);

        // Touch the file into existence at zero length so `completion_in_bytes`
        // (always the true on-disk length, per the data model) starts truthful.
        tokio::fs::File::create(record.storage_path())
            .await
            .map_err(|e| UploadError::IoError(format!("creating upload file: {}", e)))?;

        sqlx::query(
            "INSERT INTO files (file_id, client_id, original_name, storage_path, original_size, crced_bytes, \
             completion_in_bytes, state, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.file_id().to_string())
        .bind(record.client_id().to_string())
        .bind(record.original_name())
        .bind(record.storage_path())
        .bind(record.original_size() as i64)
        .bind(record.crced_bytes() as i64)
        .bind(record.completion_in_bytes() as i64)
        .bind(state_to_str(record.state()))
        .bind(record.created_at().to_rfc3339())
        .bind(record.updated_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| UploadError::DatabaseError(e.to_string()))?;

        debug!(file_id = %record.file_id(), name = %original_name, size = original_size, "created upload file record");
        Ok(record)
    }

    async fn get_file(&self, file_id: FileId) -> Result<Option<FileRecord>, UploadError> {
        let row = sqlx::query(
            "SELECT file_id, client_id, original_name, storage_path, original_size, crced_bytes, \
             completion_in_bytes, state, created_at, updated_at FROM files WHERE file_id = ?",
        )
        .bind(file_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UploadError::DatabaseError(e.to_string()))?;

        let Some(row) = row else { return Ok(None) };
        match Self::row_to_file_record(
            row.get(0),
            row.get(1),
            row.get(2),
            row.get(3),
            row.get(4),
            row.get(5),
            row.get(6),
            row.get(7),
            row.get(8),
            row.get(9),
        ) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(file_id = %file_id, error = %e, "dropping corrupt file record on load");
                Ok(None)
            }
        }
    }

    async fn save_file(&self, record: &FileRecord) -> Result<(), UploadError> {
        sqlx::query(
            "UPDATE files SET storage_path = ?, crced_bytes = ?, completion_in_bytes = ?, state = ?, \
             updated_at = ? WHERE file_id = ?",
        )
        .bind(record.storage_path())
        .bind(record.crced_bytes() as i64)
        .bind(record.completion_in_bytes() as i64)
        .bind(state_to_str(record.state()))
        .bind(record.updated_at().to_rfc3339())
        .bind(record.file_id().to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| UploadError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn remove_file(&self, file_id: FileId) -> Result<(), UploadError> {
        if let Some(record) = self.get_file(file_id).await? {
            match tokio::fs::remove_file(record.storage_path()).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(UploadError::IoError(format!("removing upload file: {}", e))),
            }
        }

        sqlx::query("DELETE FROM files WHERE file_id = ?")
            .bind(file_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| UploadError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn list_files_for_client(&self, client_id: ClientId) -> Result<Vec<FileRecord>, UploadError> {
        let rows = sqlx::query(
            "SELECT file_id, client_id, original_name, storage_path, original_size, crced_bytes, \
             completion_in_bytes, state, created_at, updated_at FROM files WHERE client_id = ?",
        )
        .bind(client_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| UploadError::DatabaseError(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if let Ok(record) = Self::row_to_file_record(
                row.get(0),
                row.get(1),
                row.get(2),
                row.get(3),
                row.get(4),
                row.get(5),
                row.get(6),
                row.get(7),
                row.get(8),
                row.get(9),
            ) {
                out.push(record);
            }
        }
        Ok(out)
    }

    async fn list_all_files(&self) -> Result<Vec<FileRecord>, UploadError> {
        let rows = sqlx::query(
            "SELECT file_id, client_id, original_name, storage_path, original_size, crced_bytes, \
             completion_in_bytes, state, created_at, updated_at FROM files",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| UploadError::DatabaseError(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match Self::row_to_file_record(
                row.get(0),
                row.get(1),
                row.get(2),
                row.get(3),
                row.get(4),
                row.get(5),
                row.get(6),
                row.get(7),
                row.get(8),
                row.get(9),
            ) {
                Ok(record) => out.push(record),
                Err(e) => warn!(error = %e, "dropping corrupt file record during list_all_files"),
            }
        }
        Ok(out)
    }

    async fn get_or_create_client(
        &self,
        client_id: ClientId,
        default_rate_kb: u32,
    ) -> Result<ClientRecord, UploadError> {
        let row = sqlx::query(
            "SELECT client_id, allotted_rate_kb, active_upload_count, created_at, updated_at FROM clients \
             WHERE client_id = ?",
        )
        .bind(client_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UploadError::DatabaseError(e.to_string()))?;

        if let Some(row) = row {
            let created_at: String = row.get(3);
            let updated_at: String = row.get(4);
            return Ok(ClientRecord::from_parts(
                client_id,
                row.get::<i64, _>(1) as u32,
                row.get::<i64, _>(2) as u32,
                DateTime::<Utc>::from_str(&created_at).map_err(|e| UploadError::SerializationError(e.to_string()))?,
                DateTime::<Utc>::from_str(&updated_at).map_err(|e| UploadError::SerializationError(e.to_string()))?,
            ));
        }

        let record = ClientRecord::new(client_id, default_rate_kb);
        sqlx::query(
            "INSERT INTO clients (client_id, allotted_rate_kb, active_upload_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.client_id().to_string())
        .bind(record.allotted_rate_kb() as i64)
        .bind(record.active_upload_count() as i64)
        .bind(record.created_at().to_rfc3339())
        .bind(record.updated_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| UploadError::DatabaseError(e.to_string()))?;
        Ok(record)
    }

    async fn save_client(&self, record: &ClientRecord) -> Result<(), UploadError> {
        sqlx::query(
            "UPDATE clients SET allotted_rate_kb = ?, active_upload_count = ?, updated_at = ? WHERE client_id = ?",
        )
        .bind(record.allotted_rate_kb() as i64)
        .bind(record.active_upload_count() as i64)
        .bind(record.updated_at().to_rfc3339())
        .bind(record.client_id().to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| UploadError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), UploadError> {
        sqlx::query("DELETE FROM files")
            .execute(&self.pool)
            .await
            .map_err(|e| UploadError::DatabaseError(e.to_string()))?;
        sqlx::query("DELETE FROM clients")
            .execute(&self.pool)
            .await
            .map_err(|e| UploadError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (SqliteStateStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let db_url = format!("sqlite://{}/state.db", dir.path().to_string_lossy());
        let storage_dir = dir.path().join("files");
        let store = SqliteStateStore::connect(&db_url, storage_dir).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (store, _dir) = store().await;
        let client_id = ClientId::new();
        let created = store.create_file(client_id, "a.bin".into(), 100).await.unwrap();
        let fetched = store.get_file(created.file_id()).await.unwrap().unwrap();
        assert_eq!(fetched.file_id(), created.file_id());
        assert_eq!(fetched.original_size(), 100);
        assert_eq!(fetched.state(), UploadState::Prepared);
        assert!(std::path::Path::new(fetched.storage_path()).exists());
    }

    #[tokio::test]
    async fn save_file_persists_progress() {
        let (store, _dir) = store().await;
        let client_id = ClientId::new();
        let mut record = store.create_file(client_id, "a.bin".into(), 100).await.unwrap();
        record.start_receiving().unwrap();
        record.record_bytes_appended(50).unwrap();
        record.mark_crced_through_completion();
        store.save_file(&record).await.unwrap();

        let fetched = store.get_file(record.file_id()).await.unwrap().unwrap();
        assert_eq!(fetched.crced_bytes(), 50);
        assert_eq!(fetched.completion_in_bytes(), 50);
    }

    #[tokio::test]
    async fn remove_file_drops_the_record_and_deletes_the_file() {
        let (store, _dir) = store().await;
        let client_id = ClientId::new();
        let record = store.create_file(client_id, "a.bin".into(), 10).await.unwrap();
        let storage_path = record.storage_path().to_string();
        store.remove_file(record.file_id()).await.unwrap();
        assert!(store.get_file(record.file_id()).await.unwrap().is_none());
        assert!(!tokio::fs::try_exists(&storage_path).await.unwrap());
    }

    #[tokio::test]
    async fn remove_file_on_unknown_id_is_a_no_op() {
        let (store, _dir) = store().await;
        store.remove_file(FileId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn get_or_create_client_is_idempotent() {
        let (store, _dir) = store().await;
        let client_id = ClientId::new();
        let first = store.get_or_create_client(client_id, 1024).await.unwrap();
        let second = store.get_or_create_client(client_id, 9999).await.unwrap();
        assert_eq!(first.allotted_rate_kb(), second.allotted_rate_kb());
    }

    #[tokio::test]
    async fn list_files_for_client_only_returns_that_clients_files() {
        let (store, _dir) = store().await;
        let a = ClientId::new();
        let b = ClientId::new();
        store.create_file(a, "a.bin".into(), 10).await.unwrap();
        store.create_file(b, "b.bin".into(), 20).await.unwrap();

        let a_files = store.list_files_for_client(a).await.unwrap();
        assert_eq!(a_files.len(), 1);
        assert_eq!(a_files[0].client_id(), a);
    }

    #[tokio::test]
    async fn clear_wipes_everything() {
        let (store, _dir) = store().await;
        let client_id = ClientId::new();
        store.create_file(client_id, "a.bin".into(), 10).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.list_all_files().await.unwrap().is_empty());
    }
}
