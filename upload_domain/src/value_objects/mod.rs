//! Immutable, self-validating domain value objects.

mod client_id;
mod crc32_digest;
mod file_id;
mod generic_id;
mod rate_limiter_config;

pub use client_id::ClientId;
pub use crc32_digest::Crc32Digest;
pub use file_id::FileId;
pub use generic_id::{GenericId, IdCategory};
pub use rate_limiter_config::RateLimiterConfig;
