//! Domain error taxonomy.

mod upload_error;

pub use upload_error::UploadError;
