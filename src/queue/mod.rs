// Upload queue component: record model, alert lifecycle and the manager
// that drives concurrent uploads.

pub mod alerts;
pub mod manager;
pub mod record;

pub use alerts::{Alert, AlertCenter, AlertKind};
pub use manager::{QueueEvent, UploadQueue};
pub use record::{FileCandidate, FileId, QueuedFile, UploadStatus};
