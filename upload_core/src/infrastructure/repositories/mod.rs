// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed persistence adapters implementing `upload_domain`'s ports.

pub mod schema;
pub mod sqlite_state_store;

pub use sqlite_state_store::SqliteStateStore;
