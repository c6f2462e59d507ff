// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Configuration Registry
//!
//! The ephemeral, demand-created `fileId -> control block` mapping the rate
//! limiter and chunk processor share. Entries are plain atomics rather than
//! `UploadProcessingConfiguration` itself because the limiter (one thread)
//! and the processor (one task per chunk) mutate the same fields
//! concurrently without a lock; a snapshot is taken only when a caller
//! (`getConfig`, `getProgress`) actually needs one.
//!
//! Backed by `DashMap` rather than the teacher's global-singleton
//! `resource_manager` pattern: this registry's entries are per-key and
//! idle-evicted, which is a sharded concurrent map's job, not a fixed set of
//! semaphores.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

use upload_domain::{ClientId, FileId, UploadProcessingConfiguration};

/// Live, atomically-mutated state for one active upload. Never persisted;
/// lost (and recreated zeroed) across a restart, matching the spec's
/// "ephemeral" classification for this data.
pub struct UploadControlBlock {
    file_id: FileId,
    client_id: ClientId,
    desired_rate_kb: AtomicU32,
    allowance_bytes: AtomicI64,
    consumed_this_tick: AtomicU64,
    instant_rate_bytes: AtomicU64,
    paused: AtomicBool,
    cancel_requested: AtomicBool,
    last_accessed: Mutex<Instant>,
    /// Notified by the rate limiter at the end of every tick; a processor
    /// parked on a zero allowance waits on this instead of polling.
    pub(crate) tick: Notify,
    /// Notified by `resume`; a processor parked on `paused` waits on this.
    pub(crate) resume: Notify,
}

impl UploadControlBlock {
    fn new(file_id: FileId, client_id: ClientId, desired_rate_kb: u32) -> Self {
        Self {
            file_id,
            client_id,
            desired_rate_kb: AtomicU32::new(desired_rate_kb),
            // Unlimited until a `RateLimiterScheduler` tick first assigns a
            // real share: a freshly created entry has no scheduler-set
            // allowance yet, and a processor starting before the next tick
            // (or with no scheduler running at all, as in unit tests) must
            // not park forever waiting for one. The first tick replaces
            // this with its computed share, same as every later tick.
            allowance_bytes: AtomicI64::new(i64::MAX),
            consumed_this_tick: AtomicU64::new(0),
            instant_rate_bytes: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            last_accessed: Mutex::new(Instant::now()),
            tick: Notify::new(),
            resume: Notify::new(),
        }
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn desired_rate_kb(&self) -> u32 {
        self.desired_rate_kb.load(Ordering::Relaxed)
    }

    pub fn allowance_bytes(&self) -> i64 {
        self.allowance_bytes.load(Ordering::Relaxed)
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    pub fn instant_rate_bytes(&self) -> u64 {
        self.instant_rate_bytes.load(Ordering::Relaxed)
    }

    /// Called by the rate limiter: replaces (never adds to) the allowance.
    pub(crate) fn set_allowance_bytes(&self, bytes: i64) {
        self.allowance_bytes.store(bytes, Ordering::Relaxed);
        self.tick.notify_waiters();
    }

    /// Called by the rate limiter at the start of each tick: reads and
    /// resets the previous tick's consumption, publishing it as the
    /// instantaneous rate.
    pub(crate) fn roll_instant_rate(&self) {
        let consumed = self.consumed_this_tick.swap(0, Ordering::Relaxed);
        self.instant_rate_bytes.store(consumed, Ordering::Relaxed);
    }

    /// Called by the chunk processor: atomically decrements the allowance
    /// and records the bytes toward this tick's throughput figure.
    pub fn consume(&self, n: u64) {
        self.allowance_bytes.fetch_sub(n as i64, Ordering::Relaxed);
        self.consumed_this_tick.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
        if !paused {
            self.resume.notify_waiters();
        }
    }

    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
        // Wake anything parked on pause or allowance so it can observe the
        // cancel flag promptly instead of waiting out the next tick.
        self.resume.notify_waiters();
        self.tick.notify_waiters();
    }

    pub fn reset(&self) {
        self.paused.store(false, Ordering::Release);
        self.cancel_requested.store(false, Ordering::Release);
        self.allowance_bytes.store(0, Ordering::Relaxed);
        self.consumed_this_tick.store(0, Ordering::Relaxed);
        self.instant_rate_bytes.store(0, Ordering::Relaxed);
    }

    pub fn set_desired_rate_kb(&self, rate_kb: u32) {
        self.desired_rate_kb.store(rate_kb, Ordering::Relaxed);
    }

    fn touch(&self) {
        *self.last_accessed.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_accessed.lock().elapsed()
    }

    pub fn snapshot(&self) -> UploadProcessingConfiguration {
        let mut config = UploadProcessingConfiguration::new(self.file_id, self.desired_rate_kb());
        config.set_current_allowance_bytes(self.allowance_bytes().max(0) as u64);
        config.set_paused(self.paused());
        if self.cancel_requested() {
            config.request_cancel();
        }
        config
    }
}

/// Demand-created, idle-evicted registry of `UploadControlBlock`s. One
/// instance is shared by the rate limiter and every chunk processor task.
#[derive(Clone)]
pub struct ConfigRegistry {
    entries: Arc<DashMap<FileId, Arc<UploadControlBlock>>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Returns the control block for `file_id`, creating one seeded with
    /// `client_id`/`default_rate_kb` on first access. Subsequent calls for
    /// the same id ignore the seed arguments and return the existing entry.
    pub fn get_or_create(&self, file_id: FileId, client_id: ClientId, default_rate_kb: u32) -> Arc<UploadControlBlock> {
        let block = self
            .entries
            .entry(file_id)
            .or_insert_with(|| Arc::new(UploadControlBlock::new(file_id, client_id, default_rate_kb)))
            .clone();
        block.touch();
        block
    }

    pub fn get(&self, file_id: FileId) -> Option<Arc<UploadControlBlock>> {
        let entry = self.entries.get(&file_id).map(|e| e.clone());
        if let Some(block) = &entry {
            block.touch();
        }
        entry
    }

    pub fn get_all(&self) -> Vec<Arc<UploadControlBlock>> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    pub fn reset(&self, file_id: FileId) {
        if let Some(block) = self.entries.get(&file_id) {
            block.reset();
        }
    }

    pub fn pause(&self, file_id: FileId) {
        if let Some(block) = self.entries.get(&file_id) {
            block.set_paused(true);
        }
    }

    pub fn resume(&self, file_id: FileId) {
        if let Some(block) = self.entries.get(&file_id) {
            block.set_paused(false);
        }
    }

    /// Requests cancellation, returning whether an entry existed to cancel.
    pub fn mark_cancel(&self, file_id: FileId) -> bool {
        match self.entries.get(&file_id) {
            Some(block) => {
                block.request_cancel();
                true
            }
            None => false,
        }
    }

    pub fn assign_rate(&self, file_id: FileId, rate_kb: u32) {
        if let Some(block) = self.entries.get(&file_id) {
            block.set_desired_rate_kb(rate_kb);
        }
    }

    pub fn remove(&self, file_id: FileId) {
        self.entries.remove(&file_id);
    }

    /// Drops every entry untouched for longer than `idle_window`. Intended
    /// to run on its own periodic task alongside the rate-limiter ticker.
    pub fn evict_idle(&self, idle_window: Duration) {
        self.entries.retain(|_, block| block.idle_for() < idle_window);
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent_per_file_id() {
        let registry = ConfigRegistry::new();
        let file_id = FileId::new();
        let client_id = ClientId::new();
        let first = registry.get_or_create(file_id, client_id, 1024);
        first.set_desired_rate_kb(2048);
        let second = registry.get_or_create(file_id, client_id, 1024);
        assert_eq!(second.desired_rate_kb(), 2048);
    }

    #[test]
    fn mark_cancel_reports_whether_an_entry_existed() {
        let registry = ConfigRegistry::new();
        assert!(!registry.mark_cancel(FileId::new()));

        let file_id = FileId::new();
        registry.get_or_create(file_id, ClientId::new(), 1024);
        assert!(registry.mark_cancel(file_id));
        assert!(registry.get(file_id).unwrap().cancel_requested());
    }

    #[test]
    fn consume_decrements_allowance_and_tracks_throughput() {
        let block = UploadControlBlock::new(FileId::new(), ClientId::new(), 1024);
        block.set_allowance_bytes(1000);
        block.consume(400);
        assert_eq!(block.allowance_bytes(), 600);
        block.roll_instant_rate();
        assert_eq!(block.instant_rate_bytes(), 400);
    }

    #[test]
    fn evict_idle_drops_untouched_entries() {
        let registry = ConfigRegistry::new();
        let file_id = FileId::new();
        registry.get_or_create(file_id, ClientId::new(), 1024);
        registry.evict_idle(Duration::from_secs(0));
        assert!(registry.get(file_id).is_none());
    }

    #[test]
    fn reset_clears_pause_and_cancel_flags() {
        let registry = ConfigRegistry::new();
        let file_id = FileId::new();
        let block = registry.get_or_create(file_id, ClientId::new(), 1024);
        block.set_paused(true);
        block.request_cancel();
        registry.reset(file_id);
        assert!(!block.paused());
        assert!(!block.cancel_requested());
    }
}
