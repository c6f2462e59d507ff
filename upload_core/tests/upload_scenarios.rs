// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios exercising the orchestrator, chunk processor, rate
//! limiter, and state store together against a real (temp-dir) SQLite
//! database and real files on disk. Mirrors the seed scenarios named in the
//! design's testable-properties section.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::oneshot;

use upload_core::{
    ChunkProcessor, ClientId, CompletionListener, ConfigRegistry, Crc32Digest, CrcEngine, DefaultUploadOrchestrator,
    FileId, RateLimiterConfig, RateLimiterScheduler, SqliteStateStore, StateStoreRepository, UploadError,
    UploadMetrics, UploadOrchestrator,
};

async fn test_store() -> (Arc<dyn StateStoreRepository>, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().unwrap();
    let db_url = format!("sqlite://{}/state.db", dir.path().to_string_lossy());
    let storage_dir = dir.path().join("files");
    let store = SqliteStateStore::connect(&db_url, storage_dir).await.unwrap();
    (Arc::new(store), dir)
}

/// A stream that reads from `source` normally until `fail_after` bytes have
/// been handed out, then returns an I/O error on every subsequent poll —
/// modeling a client that stops streaming mid-chunk.
struct DisconnectingStream {
    source: std::io::Cursor<Vec<u8>>,
    fail_after: usize,
    delivered: usize,
}

impl AsyncRead for DisconnectingStream {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        if this.delivered >= this.fail_after {
            return Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client hung up")));
        }
        let remaining_before_fail = this.fail_after - this.delivered;
        let cap = buf.remaining().min(remaining_before_fail);
        let start = this.source.position() as usize;
        let end = (start + cap).min(this.source.get_ref().len());
        let slice = &this.source.get_ref()[start..end];
        buf.put_slice(slice);
        this.source.set_position(end as u64);
        this.delivered += slice.len();
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn scenario_1_invalid_crc_on_first_chunk_leaves_nothing_committed() {
    let (store, _dir) = test_store().await;
    let registry = Arc::new(ConfigRegistry::new());
    let metrics = Arc::new(UploadMetrics::new().unwrap());
    let processor = ChunkProcessor::new(store.clone(), registry, metrics, 64, true);

    let file_id = store.create_file(ClientId::new(), "nine.bin".into(), 9).await.unwrap().file_id();

    let bad_crc = Crc32Digest::parse("0000fafa").unwrap();
    let (tx, rx) = oneshot::channel();
    let listener = CompletionListener::new(
        || panic!("unexpected success"),
        move |e| {
            let _ = tx.send(e);
        },
    );
    processor.process(file_id, bad_crc, b"123".as_slice(), listener).await;
    assert!(matches!(rx.await.unwrap(), UploadError::InvalidCrc { .. }));

    let record = store.get_file(file_id).await.unwrap().unwrap();
    assert_eq!(record.crced_bytes(), 0);
    assert_eq!(record.completion_in_bytes(), 0);
    assert_eq!(tokio::fs::metadata(record.storage_path()).await.unwrap().len(), 0);
}

#[tokio::test]
async fn scenario_2_sequential_three_chunk_upload_reaches_100_percent() {
    let (store, _dir) = test_store().await;
    let registry = Arc::new(ConfigRegistry::new());
    let metrics = Arc::new(UploadMetrics::new().unwrap());
    let processor = ChunkProcessor::new(store.clone(), registry.clone(), metrics, 64, true);
    let orchestrator = DefaultUploadOrchestrator::new(
        store.clone(),
        registry.clone(),
        Arc::new(ChunkProcessor::new(store.clone(), registry, Arc::new(UploadMetrics::new().unwrap()), 64, true)),
        RateLimiterConfig::default(),
        true,
    );

    let client = ClientId::new();
    let file_id = orchestrator.prepare_upload(client, "nine.bin".into(), 9).await.unwrap();

    let source = b"123456789";
    let mut progress_after_each_chunk = vec![];
    for (start, end) in [(0usize, 3usize), (3, 5), (5, 9)] {
        let (digest, _) = CrcEngine::buffered_crc(&source[start..end]).unwrap();
        let (tx, rx) = oneshot::channel();
        let listener = CompletionListener::new(
            move || {
                let _ = tx.send(());
            },
            |e| panic!("unexpected chunk failure: {e}"),
        );
        processor.process(file_id, digest, &source[start..end], listener).await;
        rx.await.unwrap();
        progress_after_each_chunk.push(orchestrator.get_progress(file_id).await.unwrap().round() as i64);
    }

    assert_eq!(progress_after_each_chunk, vec![33, 55, 100]);
    let on_disk = tokio::fs::read(store.get_file(file_id).await.unwrap().unwrap().storage_path())
        .await
        .unwrap();
    assert_eq!(on_disk, source);
}

#[tokio::test]
async fn scenario_3_stream_disconnect_then_reconciliation_then_resume() {
    let (store, _dir) = test_store().await;
    let registry = Arc::new(ConfigRegistry::new());
    let metrics = Arc::new(UploadMetrics::new().unwrap());
    let processor = Arc::new(ChunkProcessor::new(store.clone(), registry.clone(), metrics, 8, true));
    let orchestrator =
        DefaultUploadOrchestrator::new(store.clone(), registry, processor.clone(), RateLimiterConfig::default(), true);

    let client = ClientId::new();
    let source: Vec<u8> = (0u8..40).collect();
    let file_id = orchestrator.prepare_upload(client, "forty.bin".into(), source.len() as u64).await.unwrap();

    let (whole_crc, _) = CrcEngine::buffered_crc(source.as_slice()).unwrap();
    let stream = DisconnectingStream {
        source: std::io::Cursor::new(source.clone()),
        fail_after: 17,
        delivered: 0,
    };

    let (tx, rx) = oneshot::channel();
    let listener = CompletionListener::new(
        || panic!("unexpected success before disconnect"),
        move |e| {
            let _ = tx.send(e);
        },
    );
    processor.process(file_id, whole_crc, stream, listener).await;
    assert!(matches!(rx.await.unwrap(), UploadError::StreamDisconnected { .. }));

    let record = store.get_file(file_id).await.unwrap().unwrap();
    assert!(record.crced_bytes() < record.completion_in_bytes());
    let gap_start = record.crced_bytes() as usize;
    let gap_end = record.completion_in_bytes() as usize;

    let (gap_crc, _) = CrcEngine::buffered_crc(&source[gap_start..gap_end]).unwrap();
    orchestrator.verify_crc_of_unchecked_part(file_id, gap_crc).await.unwrap();

    let record = store.get_file(file_id).await.unwrap().unwrap();
    assert_eq!(record.crced_bytes(), record.completion_in_bytes());

    let resumed_from = record.completion_in_bytes() as usize;
    let (tail_crc, _) = CrcEngine::buffered_crc(&source[resumed_from..]).unwrap();
    let (tx, rx) = oneshot::channel();
    let listener = CompletionListener::new(
        move || {
            let _ = tx.send(());
        },
        |e| panic!("unexpected failure resuming: {e}"),
    );
    processor.process(file_id, tail_crc, &source[resumed_from..], listener).await;
    rx.await.unwrap();

    let on_disk = tokio::fs::read(store.get_file(file_id).await.unwrap().unwrap().storage_path())
        .await
        .unwrap();
    assert_eq!(on_disk, source);
    let (final_crc, _) = CrcEngine::buffered_crc(on_disk.as_slice()).unwrap();
    assert_eq!(final_crc.value(), whole_crc.value());
}

#[tokio::test]
async fn scenario_4_tampered_reconciliation_rolls_back_to_crced_bytes() {
    let (store, _dir) = test_store().await;
    let registry = Arc::new(ConfigRegistry::new());
    let metrics = Arc::new(UploadMetrics::new().unwrap());
    let processor = Arc::new(ChunkProcessor::new(store.clone(), registry.clone(), metrics, 8, true));
    let orchestrator =
        DefaultUploadOrchestrator::new(store.clone(), registry, processor.clone(), RateLimiterConfig::default(), true);

    let client = ClientId::new();
    let source: Vec<u8> = (0u8..40).collect();
    let file_id = orchestrator.prepare_upload(client, "forty.bin".into(), source.len() as u64).await.unwrap();

    let (whole_crc, _) = CrcEngine::buffered_crc(source.as_slice()).unwrap();
    let stream = DisconnectingStream {
        source: std::io::Cursor::new(source.clone()),
        fail_after: 17,
        delivered: 0,
    };
    let (tx, rx) = oneshot::channel();
    let listener = CompletionListener::new(
        || panic!("unexpected success"),
        move |e| {
            let _ = tx.send(e);
        },
    );
    processor.process(file_id, whole_crc, stream, listener).await;
    assert!(matches!(rx.await.unwrap(), UploadError::StreamDisconnected { .. }));

    let record = store.get_file(file_id).await.unwrap().unwrap();
    let crced_before = record.crced_bytes();

    let bad_crc = Crc32Digest::parse("deadbeef").unwrap();
    let err = orchestrator.verify_crc_of_unchecked_part(file_id, bad_crc).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidCrc { .. }));

    let record = store.get_file(file_id).await.unwrap().unwrap();
    assert_eq!(record.completion_in_bytes(), crced_before);
    assert_eq!(record.crced_bytes(), crced_before);
    let on_disk_len = tokio::fs::metadata(record.storage_path()).await.unwrap().len();
    assert_eq!(on_disk_len, crced_before);
}

#[tokio::test]
async fn scenario_5_pause_freezes_on_disk_length_until_resumed() {
    let (store, _dir) = test_store().await;
    let registry = Arc::new(ConfigRegistry::new());
    let record = store.create_file(ClientId::new(), "big.bin".into(), 4096).await.unwrap();
    let file_id = record.file_id();
    let control = registry.get_or_create(file_id, record.client_id(), 1024 * 1024);

    let metrics = Arc::new(UploadMetrics::new().unwrap());
    let processor = Arc::new(ChunkProcessor::new(store.clone(), registry.clone(), metrics, 256, true));

    // A generously fast ticker keeps the allowance topped up without this
    // test depending on any crate-private setter.
    let scheduler = RateLimiterScheduler::spawn(
        registry.clone(),
        RateLimiterConfig::new(1024 * 1024, 1, 1024 * 1024 * 4, 1024 * 1024 * 4, 1024 * 1024 * 4).unwrap(),
        Duration::from_millis(5),
    );

    let source: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let processor_clone = processor.clone();
    let source_clone = source.clone();
    let (tx, rx) = oneshot::channel();
    let listener = CompletionListener::new(
        move || {
            let _ = tx.send(());
        },
        |e| panic!("unexpected failure: {e}"),
    );
    let handle = tokio::spawn(async move {
        processor_clone
            .process(file_id, CrcEngine::buffered_crc(source_clone.as_slice()).unwrap().0, source_clone.as_slice(), listener)
            .await;
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    control.set_paused(true);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let path = store.get_file(file_id).await.unwrap().unwrap().storage_path().to_string();
    let len_at_pause = tokio::fs::metadata(&path).await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let len_after_window = tokio::fs::metadata(&path).await.unwrap().len();
    assert_eq!(len_at_pause, len_after_window, "no bytes should land while paused");
    assert!(len_at_pause < 4096, "the file should not already be complete when paused");

    control.set_paused(false);
    handle.await.unwrap();
    rx.await.unwrap();
    scheduler.shutdown();

    let on_disk = tokio::fs::read(&path).await.unwrap();
    assert_eq!(on_disk, source);
}

#[tokio::test]
async fn scenario_6_rate_limiter_ticks_respect_the_overall_cap() {
    let cfg = RateLimiterConfig::new(1024, 1, 2048, 2048, 2048).unwrap();
    let registry = Arc::new(ConfigRegistry::new());
    let client_a = ClientId::new();
    let client_b = ClientId::new();
    let a = registry.get_or_create(FileId::new(), client_a, 2048);
    let b = registry.get_or_create(FileId::new(), client_b, 2048);

    let scheduler = RateLimiterScheduler::spawn(registry.clone(), cfg.clone(), Duration::from_millis(30));
    tokio::time::sleep(Duration::from_millis(80)).await;
    scheduler.shutdown();

    let sum = a.allowance_bytes().max(0) as u64 + b.allowance_bytes().max(0) as u64;
    assert!(sum <= cfg.maximum_overall_rate_kb() as u64 * 1024 + 2);
}

#[tokio::test]
async fn cancel_during_process_deletes_the_file_and_reports_cancelled() {
    let (store, _dir) = test_store().await;
    let registry = Arc::new(ConfigRegistry::new());
    let metrics = Arc::new(UploadMetrics::new().unwrap());
    let record = store.create_file(ClientId::new(), "c.bin".into(), 9).await.unwrap();
    let file_id = record.file_id();
    let control = registry.get_or_create(file_id, record.client_id(), 0);
    control.request_cancel();

    let processor = ChunkProcessor::new(store.clone(), registry, metrics, 64, true);
    let (tx, rx) = oneshot::channel();
    let listener = CompletionListener::new(
        || panic!("unexpected success"),
        move |e| {
            let _ = tx.send(e);
        },
    );
    processor.process(file_id, Crc32Digest::from_value(0), b"123456789".as_slice(), listener).await;
    assert!(matches!(rx.await.unwrap(), UploadError::Cancelled(_)));
    let record = store.get_file(file_id).await.unwrap().unwrap();
    assert!(!tokio::fs::try_exists(record.storage_path()).await.unwrap());
}
