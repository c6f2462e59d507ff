// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Core Binary
//!
//! Composition root. Full HTTP serving is out of scope (spec §1), so this
//! binary exposes the admin-ish surface that is: `serve` starts the rate
//! limiter ticker and blocks for a shutdown signal, `stat` prints the
//! persisted state-store snapshot, `gc` sweeps files left on disk for
//! records stuck in `Cancelled`.

use std::sync::Arc;
use std::time::Duration;

use upload_bootstrap::shutdown::ShutdownCoordinator;
use upload_bootstrap::signals::{create_signal_handler, SystemSignals};
use upload_bootstrap::{bootstrap_cli, result_to_exit_code, ValidatedCommand};

use upload_core::{
    ChunkProcessor, ConfigRegistry, DefaultUploadOrchestrator, RateLimiterScheduler, SqliteStateStore,
    StateStoreRepository, UploadCoreConfig, UploadError, UploadMetrics, UploadState,
};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _ = upload_core::infrastructure::logging::init_tracing();

    let validated = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("argument error: {e}");
            return std::process::ExitCode::from(64); // EX_USAGE
        }
    };

    let result = run(validated).await;
    result_to_exit_code(result).into()
}

async fn run(cli: upload_bootstrap::ValidatedCli) -> Result<(), UploadError> {
    let config = UploadCoreConfig::load(cli.config.as_deref())?;

    let state_store: Arc<dyn StateStoreRepository> =
        Arc::new(SqliteStateStore::connect(&config.database_url, config.storage_dir.clone()).await?);

    match cli.command {
        ValidatedCommand::Serve => serve(state_store, config).await,
        ValidatedCommand::Stat { client } => stat(state_store.as_ref(), client).await,
        ValidatedCommand::Gc { dry_run } => gc(state_store.as_ref(), dry_run).await,
    }
}

async fn serve(state_store: Arc<dyn StateStoreRepository>, config: UploadCoreConfig) -> Result<(), UploadError> {
    let registry = Arc::new(ConfigRegistry::new());
    let metrics = Arc::new(UploadMetrics::new()?);

    let scheduler = RateLimiterScheduler::spawn(registry.clone(), config.rate_limiter.clone(), config.tick_period());
    let eviction_registry = registry.clone();
    let idle_window = config.registry_idle_eviction();
    let eviction_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(idle_window / 2);
        loop {
            interval.tick().await;
            eviction_registry.evict_idle(idle_window);
        }
    });

    let processor = Arc::new(
        ChunkProcessor::new(
            state_store.clone(),
            registry.clone(),
            metrics,
            config.read_buffer_size,
            config.delete_on_cancel,
        )
        .with_max_pause(config.max_pause()),
    );

    let _orchestrator = DefaultUploadOrchestrator::new(
        state_store,
        registry,
        processor,
        config.rate_limiter.clone(),
        config.delete_on_cancel,
    );

    let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
    let signals = create_signal_handler();
    let token = coordinator.token();

    tracing::info!(tick_period_ms = config.tick_period_ms, "serving");

    signals
        .wait_for_signal(Box::new(move || {
            coordinator.initiate_shutdown();
        }))
        .await;

    token.cancelled().await;
    scheduler.shutdown();
    eviction_handle.abort();
    Ok(())
}

async fn stat(state_store: &dyn StateStoreRepository, client_filter: Option<String>) -> Result<(), UploadError> {
    let records = state_store.list_all_files().await?;
    let filter = client_filter
        .map(|s| upload_core::ClientId::from_string(&s))
        .transpose()?;

    for record in &records {
        if let Some(ref client_id) = filter {
            if record.client_id() != *client_id {
                continue;
            }
        }
        println!(
            "{}\t{}\t{:?}\t{}/{} crced\t{} written",
            record.file_id(),
            record.original_name(),
            record.state(),
            record.crced_bytes(),
            record.original_size(),
            record.completion_in_bytes(),
        );
    }
    Ok(())
}

async fn gc(state_store: &dyn StateStoreRepository, dry_run: bool) -> Result<(), UploadError> {
    let records = state_store.list_all_files().await?;
    let mut swept = 0usize;

    for record in records.into_iter().filter(|r| r.state() == UploadState::Cancelled) {
        if tokio::fs::try_exists(record.storage_path()).await.unwrap_or(false) {
            if dry_run {
                println!("would remove orphaned file for {}: {}", record.file_id(), record.storage_path());
            } else {
                tokio::fs::remove_file(record.storage_path()).await.ok();
                println!("removed orphaned file for {}: {}", record.file_id(), record.storage_path());
            }
            swept += 1;
        }
    }

    if swept == 0 {
        println!("no orphaned files found");
    }
    Ok(())
}
