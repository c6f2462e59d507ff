// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rate Limiter Scheduler
//!
//! A cooperative token-bucket scheduler running on its own `tokio::time`
//! ticker: every tick it recomputes each active upload's byte allowance
//! from its desired rate, scaled down to respect the per-client and global
//! caps, and replaces (never adds to) the previous allowance.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use upload_domain::{ClientId, RateLimiterConfig};

use crate::infrastructure::runtime::config_registry::{ConfigRegistry, UploadControlBlock};

/// Converts a KB/s rate and a tick period into the byte credit one tick is
/// worth: `rateKB * 1024 * tickMs / 1000`.
fn credit_for_tick(rate_kb: u32, tick_period_ms: u64) -> u64 {
    (rate_kb as u64) * 1024 * tick_period_ms / 1000
}

/// Runs the per-tick allowance assignment described in the rate limiter's
/// design table. Pure function of its inputs so it can be unit tested
/// without a ticker.
pub fn compute_allowances(
    blocks: &[Arc<UploadControlBlock>],
    config: &RateLimiterConfig,
    tick_period_ms: u64,
) -> HashMap<upload_domain::FileId, u64> {
    let active: Vec<&Arc<UploadControlBlock>> =
        blocks.iter().filter(|b| !b.paused() && !b.cancel_requested()).collect();

    let minimum_credit = credit_for_tick(config.minimum_rate_per_request_kb(), tick_period_ms);
    let maximum_per_client_credit = credit_for_tick(config.maximum_rate_per_client_kb(), tick_period_ms);
    let maximum_overall_credit = credit_for_tick(config.maximum_overall_rate_kb(), tick_period_ms);
    let default_request_kb = config.default_rate_per_request_kb();

    // Step 2: base credit per request.
    let mut credits: HashMap<upload_domain::FileId, u64> = active
        .iter()
        .map(|b| {
            let rate_kb = if b.desired_rate_kb() > 0 {
                b.desired_rate_kb()
            } else {
                default_request_kb
            };
            (b.file_id(), credit_for_tick(rate_kb, tick_period_ms))
        })
        .collect();

    // Step 3: per-client proportional scale-down.
    let mut per_client_totals: HashMap<ClientId, u64> = HashMap::new();
    for block in &active {
        *per_client_totals.entry(block.client_id()).or_insert(0) += credits[&block.file_id()];
    }
    for block in &active {
        let total = per_client_totals[&block.client_id()];
        if total > maximum_per_client_credit && total > 0 {
            let scaled = (credits[&block.file_id()] as u128 * maximum_per_client_credit as u128 / total as u128) as u64;
            credits.insert(block.file_id(), scaled);
        }
    }

    // Step 4: global proportional scale-down, floored at the per-request minimum.
    let overall_total: u64 = credits.values().sum();
    if overall_total > maximum_overall_credit && overall_total > 0 {
        for block in &active {
            let current = credits[&block.file_id()];
            let scaled = (current as u128 * maximum_overall_credit as u128 / overall_total as u128) as u64;
            credits.insert(block.file_id(), scaled.max(minimum_credit));
        }
    }

    credits
}

/// Owns the background task driving `compute_allowances` on a fixed period.
pub struct RateLimiterScheduler {
    handle: JoinHandle<()>,
}

impl RateLimiterScheduler {
    /// Spawns the ticker. Dropping the returned handle does not stop the
    /// task; call `shutdown` (or abort the process) to stop it.
    pub fn spawn(registry: Arc<ConfigRegistry>, config: RateLimiterConfig, tick_period: std::time::Duration) -> Self {
        let tick_period_ms = tick_period.as_millis() as u64;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let blocks = registry.get_all();
                for block in &blocks {
                    block.roll_instant_rate();
                }
                let allowances = compute_allowances(&blocks, &config, tick_period_ms);
                for block in &blocks {
                    if let Some(bytes) = allowances.get(&block.file_id()) {
                        block.set_allowance_bytes(*bytes as i64);
                    } else {
                        block.set_allowance_bytes(0);
                    }
                }
                debug!(active = blocks.len(), "rate limiter tick completed");
            }
        });
        Self { handle }
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}
