// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CRC Engine
//!
//! A deterministic CRC-32 checksum over a byte stream: the same bytes
//! produce the same digest on any run, on any platform. This is a pure,
//! synchronous, CPU-bound computation with no I/O of its own — the async
//! chunk processor (`upload_core`) is what feeds it bytes read from the
//! network in bursts; this module never opens a file or a socket.

use std::io::Read;

use crate::value_objects::Crc32Digest;
use crate::UploadError;

/// Read buffer size used by `CrcEngine::buffered_crc`. Large enough to
/// amortize syscall overhead, small enough to keep a bounded memory
/// footprint regardless of stream length.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Stateless entry point for one-shot CRC computation over a finite reader.
pub struct CrcEngine;

impl CrcEngine {
    /// Fully consumes `reader`, returning the final digest and the number of
    /// bytes read. Reads in fixed-size bursts so memory use stays bounded
    /// regardless of how large the stream is.
    pub fn buffered_crc<R: Read>(mut reader: R) -> Result<(Crc32Digest, u64), UploadError> {
        let mut incremental = IncrementalCrc::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            incremental.update(&buffer[..read]);
        }
        let bytes_read = incremental.bytes_processed();
        Ok((incremental.finalize(), bytes_read))
    }
}

/// Incremental CRC-32 accumulator: `update` can be called any number of
/// times with however much of the stream is available at the moment
/// (the chunk processor calls it once per rate-limited read burst),
/// `finalize` produces the digest over everything seen so far.
#[derive(Debug, Default)]
pub struct IncrementalCrc {
    hasher: crc32fast::Hasher,
    bytes_processed: u64,
}

impl IncrementalCrc {
    pub fn new() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
            bytes_processed: 0,
        }
    }

    pub fn update(&mut self, buffer: &[u8]) {
        self.hasher.update(buffer);
        self.bytes_processed += buffer.len() as u64;
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    pub fn finalize(self) -> Crc32Digest {
        Crc32Digest::from_value(self.hasher.finalize())
    }
}
