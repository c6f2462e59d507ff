// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Structure
//!
//! `clap`-derived argument structure for the upload-core binary. Since full
//! HTTP serving is out of scope, this is a small admin surface: `serve`
//! starts the rate-limiter ticker and blocks for a shutdown signal, `stat`
//! prints the state store's snapshot, and `gc` sweeps cancelled files left
//! behind by a crash between file-truncate and record-delete.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "upload-core", version, about = "Resumable, rate-limited, CRC-verified upload service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a layered TOML configuration file (defaults still apply for
    /// anything it omits; `UPLOAD_`-prefixed env vars override both).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the rate-limiter scheduler and block until a shutdown signal.
    Serve,

    /// Print a snapshot of every persisted file record.
    Stat {
        /// Restrict the snapshot to one client's files.
        #[arg(long)]
        client: Option<String>,
    },

    /// Delete on-disk files for records stuck in `Cancelled` whose file
    /// bytes survived a crash between truncate and delete.
    Gc {
        /// Report what would be deleted without deleting it.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Entry point clap parses `std::env::args()` through.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
