// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Async Chunk Processor
//!
//! The central pipeline: for one inbound chunk, await rate-limiter
//! allowance, read a burst, update the running CRC, append to the target
//! file, and repeat until the stream ends, then accept or roll back the
//! whole chunk based on whether the declared CRC matches. Outcomes never
//! cross this module's API as a `Result` — they reach the caller exclusively
//! through the `CompletionListener`, mirroring the way the teacher's
//! `AsyncChecksumAdapter` keeps a synchronous domain computation off the
//! async call path (there via `spawn_blocking`; here the CRC update itself
//! is cheap enough to run inline between awaited I/O calls).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use upload_domain::{Crc32Digest, FileId, IncrementalCrc, StateStoreRepository, UploadError};

use crate::infrastructure::metrics::UploadMetrics;
use crate::infrastructure::runtime::config_registry::ConfigRegistry;

/// Outcome callback pair for one `process` call. Modeled as a pair of
/// function values rather than a trait with inheritance, per the design
/// note on replacing callback-inheritance with listener values.
pub struct CompletionListener {
    on_success: Box<dyn FnOnce() + Send>,
    on_error: Box<dyn FnOnce(UploadError) + Send>,
}

impl CompletionListener {
    pub fn new(
        on_success: impl FnOnce() + Send + 'static,
        on_error: impl FnOnce(UploadError) + Send + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    fn success(self) {
        (self.on_success)()
    }

    fn error(self, cause: UploadError) {
        (self.on_error)(cause)
    }
}

/// Drives the chunk-processing algorithm against a state store and a
/// shared control-block registry. One instance is shared by every inbound
/// chunk; per-`file_id` serialization is enforced internally via
/// `file_locks`, matching the "one processor per fileId" invariant.
pub struct ChunkProcessor {
    state_store: Arc<dyn StateStoreRepository>,
    registry: Arc<ConfigRegistry>,
    metrics: Arc<UploadMetrics>,
    read_buffer_size: usize,
    delete_on_cancel: bool,
    max_pause: Option<Duration>,
    file_locks: DashMap<FileId, Arc<AsyncMutex<()>>>,
}

impl ChunkProcessor {
    pub fn new(
        state_store: Arc<dyn StateStoreRepository>,
        registry: Arc<ConfigRegistry>,
        metrics: Arc<UploadMetrics>,
        read_buffer_size: usize,
        delete_on_cancel: bool,
    ) -> Self {
        Self {
            state_store,
            registry,
            metrics,
            read_buffer_size,
            delete_on_cancel,
            max_pause: None,
            file_locks: DashMap::new(),
        }
    }

    /// Bounds how long a processor will park on `paused` before abandoning
    /// the upload. `None` (the default from `new`) waits forever, matching
    /// the source's permissiveness.
    pub fn with_max_pause(mut self, max_pause: Option<Duration>) -> Self {
        self.max_pause = max_pause;
        self
    }

    fn lock_for(&self, file_id: FileId) -> Arc<AsyncMutex<()>> {
        self.file_locks
            .entry(file_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Processes one chunk end to end. `input` is a finite byte source that
    /// may fail mid-stream with an I/O error; `declared_crc` is the CRC the
    /// caller claims these bytes hash to.
    pub async fn process<R>(
        &self,
        file_id: FileId,
        declared_crc: Crc32Digest,
        mut input: R,
        listener: CompletionListener,
    ) where
        R: AsyncRead + Unpin + Send,
    {
        let lock = self.lock_for(file_id);
        let _guard = lock.lock().await;

        let mut record = match self.state_store.get_file(file_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return listener.error(UploadError::NotFound(format!("file {}", file_id))),
            Err(e) => return listener.error(e),
        };

        let control = self.registry.get_or_create(file_id, record.client_id(), 0);

        if let Err(e) = record.start_receiving() {
            return listener.error(e);
        }
        if let Err(e) = self.state_store.save_file(&record).await {
            return listener.error(e);
        }

        let mut file = match OpenOptions::new().write(true).open(record.storage_path()).await {
            Ok(f) => f,
            Err(e) => return listener.error(UploadError::IoError(format!("opening upload file: {}", e))),
        };
        if let Err(e) = file.seek(SeekFrom::Start(record.completion_in_bytes())).await {
            return listener.error(UploadError::IoError(format!("seeking upload file: {}", e)));
        }

        let mut incremental = IncrementalCrc::new();
        let mut buffer = vec![0u8; self.read_buffer_size];

        loop {
            if control.cancel_requested() {
                let truncate_to = record.crced_bytes();
                let _ = file.flush().await;
                if let Err(e) = file.set_len(truncate_to).await {
                    warn!(file_id = %file_id, error = %e, "failed to truncate cancelled upload file");
                }
                drop(file);
                record.rollback_completion_to_crced();
                record.cancel();
                let _ = self.state_store.save_file(&record).await;
                if self.delete_on_cancel {
                    let _ = tokio::fs::remove_file(record.storage_path()).await;
                }
                self.metrics.cancellations_total.inc();
                self.registry.remove(file_id);
                return listener.error(UploadError::Cancelled(file_id.to_string()));
            }

            // Register interest in `resume` before re-checking `paused()`: if
            // `set_paused(false)` fires its `notify_waiters()` between the
            // check below and the `.await`, creating the future first still
            // catches it, instead of losing the wakeup and parking forever.
            let resumed = control.resume.notified();
            if control.paused() {
                match self.max_pause {
                    Some(limit) => {
                        if tokio::time::timeout(limit, resumed).await.is_err() {
                            // Abandoned, not cancelled: leave crced_bytes/completion_in_bytes
                            // untouched so a later verify_crc_of_unchecked_part or fresh
                            // process call can still resume from where this left off.
                            let _ = file.flush().await;
                            drop(file);
                            record.mark_disconnected();
                            let _ = self.state_store.save_file(&record).await;
                            self.metrics.pause_timeouts_total.inc();
                            self.registry.remove(file_id);
                            warn!(file_id = %file_id, "upload abandoned after exceeding max pause duration");
                            return listener.error(UploadError::Cancelled(file_id.to_string()));
                        }
                    }
                    None => resumed.await,
                }
                continue;
            }

            let window = control.allowance_bytes().min(self.read_buffer_size as i64);
            if window <= 0 {
                control.tick.notified().await;
                continue;
            }
            let window = window as usize;

            match input.read(&mut buffer[..window]).await {
                Ok(0) => {
                    let digest = incremental.finalize();
                    if digest.value() == declared_crc.value() {
                        if let Err(e) = file.flush().await {
                            return listener.error(UploadError::IoError(e.to_string()));
                        }
                        record.mark_crced_through_completion();
                        if let Err(e) = self.state_store.save_file(&record).await {
                            return listener.error(e);
                        }
                        self.metrics.chunks_processed_total.inc();
                        info!(file_id = %file_id, progress = record.completion_in_bytes(), "chunk committed");
                        return listener.success();
                    } else {
                        drop(file);
                        let truncate_to = record.crced_bytes();
                        if let Err(e) = truncate_file(record.storage_path(), truncate_to).await {
                            warn!(file_id = %file_id, error = %e, "failed to truncate after CRC mismatch");
                        }
                        record.rollback_completion_to_crced();
                        let _ = self.state_store.save_file(&record).await;
                        self.metrics.crc_mismatches_total.inc();
                        return listener.error(UploadError::InvalidCrc {
                            file_id: file_id.to_string(),
                            expected: declared_crc.to_string(),
                            computed: digest.to_string(),
                        });
                    }
                }
                Ok(n) => {
                    incremental.update(&buffer[..n]);
                    if let Err(e) = file.write_all(&buffer[..n]).await {
                        return listener.error(UploadError::IoError(e.to_string()));
                    }
                    let new_completion = record.completion_in_bytes() + n as u64;
                    if let Err(e) = record.record_bytes_appended(new_completion) {
                        return listener.error(e);
                    }
                    if let Err(e) = self.state_store.save_file(&record).await {
                        return listener.error(e);
                    }
                    control.consume(n as u64);
                    self.metrics.bytes_appended_total.inc_by(n as u64);
                }
                Err(e) => {
                    // Deliberately no truncation here: completion_in_bytes stays
                    // ahead of crced_bytes so a resumed client can reconcile the
                    // gap via verify_crc_of_unchecked_part instead of re-sending it.
                    let _ = e;
                    record.mark_disconnected();
                    let _ = self.state_store.save_file(&record).await;
                    self.metrics.stream_disconnects_total.inc();
                    return listener.error(UploadError::StreamDisconnected {
                        file_id: file_id.to_string(),
                        bytes_read: record.completion_in_bytes(),
                        expected: record.original_size(),
                    });
                }
            }
        }
    }
}

pub(crate) async fn truncate_file(path: &str, len: u64) -> Result<(), std::io::Error> {
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await
}
