// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Metrics
//!
//! Prometheus counters and gauges for the three subsystems: chunk
//! throughput and CRC outcomes from the async processor, active-upload and
//! allowance figures from the rate limiter. Exporting the registry over
//! HTTP is the outer layer's job (out of scope here, per spec §1); this
//! module only owns collection.

use std::sync::Arc;

use prometheus::{Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

use upload_domain::UploadError;

#[derive(Clone)]
pub struct UploadMetrics {
    registry: Arc<Registry>,

    pub chunks_processed_total: IntCounter,
    pub bytes_appended_total: IntCounter,
    pub crc_mismatches_total: IntCounter,
    pub stream_disconnects_total: IntCounter,
    pub cancellations_total: IntCounter,
    pub pause_timeouts_total: IntCounter,
    pub errors_total: IntCounterVec,

    pub active_uploads: IntGauge,
    pub aggregate_instant_rate_bytes: Gauge,
}

impl UploadMetrics {
    pub fn new() -> Result<Self, UploadError> {
        let registry = Registry::new();
        let ns = "upload_core";

        let chunks_processed_total = IntCounter::with_opts(
            Opts::new("chunks_processed_total", "Chunks that reached EOF and a CRC decision").namespace(ns),
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;
        let bytes_appended_total = IntCounter::with_opts(
            Opts::new("bytes_appended_total", "Bytes appended to on-disk upload files").namespace(ns),
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;
        let crc_mismatches_total = IntCounter::with_opts(
            Opts::new("crc_mismatches_total", "Chunks (or reconciliations) whose CRC did not match").namespace(ns),
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;
        let stream_disconnects_total = IntCounter::with_opts(
            Opts::new("stream_disconnects_total", "Chunks that ended in a read error mid-stream").namespace(ns),
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;
        let cancellations_total = IntCounter::with_opts(
            Opts::new("cancellations_total", "Uploads cancelled by the client").namespace(ns),
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;
        let pause_timeouts_total = IntCounter::with_opts(
            Opts::new("pause_timeouts_total", "Uploads abandoned after exceeding the configured max pause duration")
                .namespace(ns),
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;
        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Errors returned by the orchestrator, by category").namespace(ns),
            &["category"],
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;
        let active_uploads = IntGauge::with_opts(
            Opts::new("active_uploads", "Upload configurations currently registered").namespace(ns),
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;
        let aggregate_instant_rate_bytes = Gauge::with_opts(
            Opts::new(
                "aggregate_instant_rate_bytes",
                "Sum of instantaneous per-file throughput observed in the last tick",
            )
            .namespace(ns),
        )
        .map_err(|e| UploadError::InternalError(e.to_string()))?;

        registry
            .register(Box::new(chunks_processed_total.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;
        registry
            .register(Box::new(bytes_appended_total.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;
        registry
            .register(Box::new(crc_mismatches_total.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;
        registry
            .register(Box::new(stream_disconnects_total.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;
        registry
            .register(Box::new(cancellations_total.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;
        registry
            .register(Box::new(pause_timeouts_total.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;
        registry
            .register(Box::new(errors_total.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;
        registry
            .register(Box::new(active_uploads.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;
        registry
            .register(Box::new(aggregate_instant_rate_bytes.clone()))
            .map_err(|e| UploadError::InternalError(e.to_string()))?;

        Ok(Self {
            registry: Arc::new(registry),
            chunks_processed_total,
            bytes_appended_total,
            crc_mismatches_total,
            stream_disconnects_total,
            cancellations_total,
            pause_timeouts_total,
            errors_total,
            active_uploads,
            aggregate_instant_rate_bytes,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_error(&self, category: upload_domain::ErrorCategory) {
        self.errors_total.with_label_values(&[&category.to_string()]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_without_duplicate_collector_errors() {
        let metrics = UploadMetrics::new().unwrap();
        metrics.chunks_processed_total.inc();
        metrics.record_error(upload_domain::ErrorCategory::Integrity);
        assert_eq!(metrics.chunks_processed_total.get(), 1);
        let families = metrics.registry().gather();
        assert!(!families.is_empty());
    }
}
