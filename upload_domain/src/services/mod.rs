//! Stateless domain services: pure business logic with no I/O of its own.

mod crc_engine;

pub use crc_engine::{CrcEngine, IncrementalCrc};
