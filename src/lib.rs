//! Upload queue for neural-recording data files.
//!
//! Validates user-selected `.xml`/`.dat`/`.nrs` files client-side, uploads
//! them to a configured backend endpoint as multipart/form-data with per-file
//! progress reporting, and maintains a transient auto-dismissing alert for
//! the embedding view layer.

pub mod client;
pub mod config;
pub mod errors;
pub mod queue;
pub mod validation;

pub use client::BackendClient;
pub use config::UploaderConfig;
pub use errors::{UploadError, UploadResult};
pub use queue::{
    Alert, AlertKind, FileCandidate, FileId, QueueEvent, QueuedFile, UploadQueue, UploadStatus,
};
pub use validation::FileValidator;
