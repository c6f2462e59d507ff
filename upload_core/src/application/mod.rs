// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Layer
//!
//! Use-case orchestration sitting above the domain entities and the
//! runtime's chunk processor / rate limiter / registry: the façade an
//! (absent) HTTP layer would drive.

pub mod orchestrator;

pub use orchestrator::{DefaultUploadOrchestrator, UploadConfigSnapshot, UploadOrchestrator};
