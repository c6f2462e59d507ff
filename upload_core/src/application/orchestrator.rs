// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Orchestrator
//!
//! The façade the (out-of-scope) HTTP layer is meant to drive: registering
//! new uploads, handing chunk bodies to the chunk processor, reporting
//! progress, and the pause/resume/cancel/rate-change admin operations. Every
//! method here is synchronous-looking from the caller's side even though
//! `process_chunk` completes asynchronously through its listener, matching
//! the "propagation policy" — synchronous calls surface errors directly,
//! the chunk pipeline never does.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, SeekFrom};

use upload_domain::{
    ClientId, Crc32Digest, CrcEngine, FileId, RateLimiterConfig, StateStoreRepository, UploadError,
};

use crate::infrastructure::runtime::chunk_processor::truncate_file;
use crate::infrastructure::runtime::{ChunkProcessor, CompletionListener, ConfigRegistry};

/// One row of `getConfig`'s snapshot list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadConfigSnapshot {
    pub file_id: FileId,
    pub original_name: String,
    pub completion_in_bytes: u64,
    pub crced_bytes: u64,
    pub original_size: u64,
}

#[async_trait]
pub trait UploadOrchestrator: Send + Sync {
    async fn prepare_upload(&self, client_id: ClientId, name: String, size: u64) -> Result<FileId, UploadError>;

    /// Hands one chunk's body to the chunk processor. `input` is boxed
    /// rather than generic so this method stays object-safe; outcomes
    /// reach the caller exclusively through `listener`, never as a
    /// `Result` from this call.
    async fn process_chunk(
        &self,
        file_id: FileId,
        declared_crc: Crc32Digest,
        input: Box<dyn AsyncRead + Unpin + Send>,
        listener: CompletionListener,
    );

    async fn get_progress(&self, file_id: FileId) -> Result<f64, UploadError>;

    async fn get_config(&self) -> Result<Vec<UploadConfigSnapshot>, UploadError>;

    async fn pause_file(&self, file_id: FileId) -> Result<(), UploadError>;

    async fn resume_file(&self, file_id: FileId) -> Result<(), UploadError>;

    async fn cancel_file(&self, file_id: FileId) -> Result<(), UploadError>;

    async fn set_upload_rate(&self, file_id: FileId, rate_kb: u32) -> Result<(), UploadError>;

    /// Reconciliation after a `StreamDisconnected` error: recomputes the CRC
    /// of the on-disk gap `[crced_bytes, completion_in_bytes)` and compares
    /// it to the client's claim for that range.
    async fn verify_crc_of_unchecked_part(&self, file_id: FileId, expected_crc: Crc32Digest) -> Result<(), UploadError>;
}

pub struct DefaultUploadOrchestrator {
    state_store: Arc<dyn StateStoreRepository>,
    registry: Arc<ConfigRegistry>,
    processor: Arc<ChunkProcessor>,
    rate_limiter_config: RateLimiterConfig,
    delete_on_cancel: bool,
}

impl DefaultUploadOrchestrator {
    pub fn new(
        state_store: Arc<dyn StateStoreRepository>,
        registry: Arc<ConfigRegistry>,
        processor: Arc<ChunkProcessor>,
        rate_limiter_config: RateLimiterConfig,
        delete_on_cancel: bool,
    ) -> Self {
        Self {
            state_store,
            registry,
            processor,
            rate_limiter_config,
            delete_on_cancel,
        }
    }

    async fn require_file(&self, file_id: FileId) -> Result<upload_domain::FileRecord, UploadError> {
        self.state_store
            .get_file(file_id)
            .await?
            .ok_or_else(|| UploadError::IncorrectRequest(format!("unknown file id {}", file_id)))
    }
}

#[async_trait]
impl UploadOrchestrator for DefaultUploadOrchestrator {
    async fn prepare_upload(&self, client_id: ClientId, name: String, size: u64) -> Result<FileId, UploadError> {
        if name.trim().is_empty() {
            return Err(UploadError::missing_parameter("name"));
        }
        if size == 0 {
            return Err(UploadError::missing_parameter("size"));
        }
        self.state_store
            .get_or_create_client(client_id, self.rate_limiter_config.default_rate_per_client_kb())
            .await?;
        let record = self.state_store.create_file(client_id, name, size).await?;
        Ok(record.file_id())
    }

    async fn process_chunk(
        &self,
        file_id: FileId,
        declared_crc: Crc32Digest,
        input: Box<dyn AsyncRead + Unpin + Send>,
        listener: CompletionListener,
    ) {
        self.processor.process(file_id, declared_crc, input, listener).await
    }

    async fn get_progress(&self, file_id: FileId) -> Result<f64, UploadError> {
        let record = self.require_file(file_id).await?;
        if record.original_size() == 0 {
            return Ok(0.0);
        }
        Ok(100.0 * record.crced_bytes() as f64 / record.original_size() as f64)
    }

    async fn get_config(&self) -> Result<Vec<UploadConfigSnapshot>, UploadError> {
        let files = self.state_store.list_all_files().await?;
        Ok(files
            .into_iter()
            .filter(|f| f.state() != upload_domain::UploadState::Cancelled)
            .map(|f| UploadConfigSnapshot {
                file_id: f.file_id(),
                original_name: f.original_name().to_string(),
                completion_in_bytes: f.completion_in_bytes(),
                crced_bytes: f.crced_bytes(),
                original_size: f.original_size(),
            })
            .collect())
    }

    async fn pause_file(&self, file_id: FileId) -> Result<(), UploadError> {
        let mut record = self.require_file(file_id).await?;
        self.registry.pause(file_id);
        if record.state() == upload_domain::UploadState::Receiving {
            record.pause()?;
            self.state_store.save_file(&record).await?;
        }
        Ok(())
    }

    async fn resume_file(&self, file_id: FileId) -> Result<(), UploadError> {
        let mut record = self.require_file(file_id).await?;
        self.registry.resume(file_id);
        if record.state() == upload_domain::UploadState::Paused {
            record.start_receiving()?;
            self.state_store.save_file(&record).await?;
        }
        Ok(())
    }

    async fn cancel_file(&self, file_id: FileId) -> Result<(), UploadError> {
        let mut record = self.require_file(file_id).await?;
        // Wake any in-flight processor so it observes the cancel flag at its
        // next loop iteration and performs its own truncate/delete; this
        // path additionally covers files with no active processor at all
        // (e.g. cancelling a file that's `Prepared` but never started).
        self.registry.mark_cancel(file_id);

        if !record.state().is_terminal() {
            if self.delete_on_cancel {
                let _ = tokio::fs::remove_file(record.storage_path()).await;
            }
            record.cancel();
            self.state_store.save_file(&record).await?;
        }
        Ok(())
    }

    async fn set_upload_rate(&self, file_id: FileId, rate_kb: u32) -> Result<(), UploadError> {
        self.require_file(file_id).await?;
        if rate_kb < self.rate_limiter_config.minimum_rate_per_request_kb() {
            return Err(UploadError::incorrect_request(format!(
                "requested rate {}KB/s is below the minimum {}KB/s",
                rate_kb,
                self.rate_limiter_config.minimum_rate_per_request_kb()
            )));
        }
        if rate_kb > self.rate_limiter_config.maximum_rate_per_client_kb() {
            return Err(UploadError::incorrect_request(format!(
                "requested rate {}KB/s exceeds the maximum {}KB/s",
                rate_kb,
                self.rate_limiter_config.maximum_rate_per_client_kb()
            )));
        }
        self.registry.assign_rate(file_id, rate_kb);
        Ok(())
    }

    async fn verify_crc_of_unchecked_part(&self, file_id: FileId, expected_crc: Crc32Digest) -> Result<(), UploadError> {
        let mut record = self.require_file(file_id).await?;
        let gap_start = record.crced_bytes();
        let gap_end = record.completion_in_bytes();

        if gap_end == gap_start {
            // Nothing unchecked to reconcile; treat as already verified.
            return Ok(());
        }

        let mut file = tokio::fs::File::open(record.storage_path())
            .await
            .map_err(|e| UploadError::IoError(e.to_string()))?;
        file.seek(SeekFrom::Start(gap_start))
            .await
            .map_err(|e| UploadError::IoError(e.to_string()))?;
        let mut gap = vec![0u8; (gap_end - gap_start) as usize];
        file.read_exact(&mut gap).await.map_err(|e| UploadError::IoError(e.to_string()))?;
        drop(file);

        let (computed, _) = CrcEngine::buffered_crc(gap.as_slice())?;
        if computed.value() == expected_crc.value() {
            record.mark_crced_through_completion();
            self.state_store.save_file(&record).await?;
            Ok(())
        } else {
            truncate_file(record.storage_path(), gap_start)
                .await
                .map_err(|e| UploadError::IoError(e.to_string()))?;
            record.rollback_completion_to_crced();
            self.state_store.save_file(&record).await?;
            Err(UploadError::InvalidCrc {
                file_id: file_id.to_string(),
                expected: expected_crc.to_string(),
                computed: computed.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::metrics::UploadMetrics;
    use crate::infrastructure::repositories::SqliteStateStore;
    use tokio::io::AsyncWriteExt;

    async fn orchestrator() -> (DefaultUploadOrchestrator, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let db_url = format!("sqlite://{}/state.db", dir.path().to_string_lossy());
        let storage_dir = dir.path().join("files");
        let store: Arc<dyn StateStoreRepository> =
            Arc::new(SqliteStateStore::connect(&db_url, storage_dir).await.unwrap());
        let registry = Arc::new(ConfigRegistry::new());
        let metrics = Arc::new(UploadMetrics::new().unwrap());
        let processor = Arc::new(ChunkProcessor::new(store.clone(), registry.clone(), metrics, 64, true));
        let orchestrator = DefaultUploadOrchestrator::new(
            store,
            registry,
            processor,
            RateLimiterConfig::default(),
            true,
        );
        (orchestrator, dir)
    }

    #[tokio::test]
    async fn prepare_upload_rejects_zero_size_and_blank_name() {
        let (orchestrator, _dir) = orchestrator().await;
        let client = ClientId::new();
        assert!(orchestrator.prepare_upload(client, "a.bin".into(), 0).await.is_err());
        assert!(orchestrator.prepare_upload(client, "  ".into(), 10).await.is_err());
    }

    #[tokio::test]
    async fn get_progress_reflects_crced_bytes() {
        let (orchestrator, _dir) = orchestrator().await;
        let client = ClientId::new();
        let file_id = orchestrator.prepare_upload(client, "a.bin".into(), 10).await.unwrap();
        assert_eq!(orchestrator.get_progress(file_id).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn verify_crc_of_unchecked_part_advances_crced_bytes_on_match() {
        let (orchestrator, _dir) = orchestrator().await;
        let client = ClientId::new();
        let file_id = orchestrator.prepare_upload(client, "a.bin".into(), 9).await.unwrap();

        let record = orchestrator.require_file(file_id).await.unwrap();
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(record.storage_path())
            .await
            .unwrap();
        file.write_all(b"123456789").await.unwrap();
        drop(file);

        let mut record = record;
        record.start_receiving().unwrap();
        record.record_bytes_appended(9).unwrap();
        orchestrator.state_store.save_file(&record).await.unwrap();

        let (digest, _) = CrcEngine::buffered_crc(b"123456789".as_slice()).unwrap();
        orchestrator.verify_crc_of_unchecked_part(file_id, digest).await.unwrap();

        let record = orchestrator.require_file(file_id).await.unwrap();
        assert_eq!(record.crced_bytes(), 9);
    }

    #[tokio::test]
    async fn verify_crc_of_unchecked_part_rolls_back_on_mismatch() {
        let (orchestrator, _dir) = orchestrator().await;
        let client = ClientId::new();
        let file_id = orchestrator.prepare_upload(client, "a.bin".into(), 9).await.unwrap();

        let record = orchestrator.require_file(file_id).await.unwrap();
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(record.storage_path())
            .await
            .unwrap();
        file.write_all(b"123456789").await.unwrap();
        drop(file);

        let mut record = record;
        record.start_receiving().unwrap();
        record.record_bytes_appended(9).unwrap();
        orchestrator.state_store.save_file(&record).await.unwrap();

        let bad = upload_domain::Crc32Digest::parse("deadbeef").unwrap();
        let err = orchestrator.verify_crc_of_unchecked_part(file_id, bad).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidCrc { .. }));

        let record = orchestrator.require_file(file_id).await.unwrap();
        assert_eq!(record.completion_in_bytes(), 0);
    }

    #[tokio::test]
    async fn cancel_file_deletes_the_partial_file_and_marks_terminal() {
        let (orchestrator, _dir) = orchestrator().await;
        let client = ClientId::new();
        let file_id = orchestrator.prepare_upload(client, "a.bin".into(), 9).await.unwrap();
        orchestrator.cancel_file(file_id).await.unwrap();

        let record = orchestrator.require_file(file_id).await.unwrap();
        assert_eq!(record.state(), upload_domain::UploadState::Cancelled);
        assert!(!std::path::Path::new(record.storage_path()).exists());
    }
}
