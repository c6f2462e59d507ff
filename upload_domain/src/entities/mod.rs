//! Domain entities: the things with identity and a lifecycle.

mod client_record;
mod file_record;
mod upload_processing_configuration;

pub use client_record::ClientRecord;
pub use file_record::{FileRecord, UploadState};
pub use upload_processing_configuration::UploadProcessingConfiguration;
