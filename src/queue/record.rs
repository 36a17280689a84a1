use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity for one queued file.
///
/// Async completions are keyed by this id, never by queue position, so a
/// record removed or reordered while its request is in flight can never
/// misdirect a late-arriving callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Upload lifecycle of one record: `Pending -> Uploading -> {Success, Error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

/// A file handed to the queue: name plus the raw payload bytes.
///
/// `Bytes` keeps the clone handed to an upload task cheap even for
/// multi-hundred-megabyte recordings.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub data: Bytes,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// One user-selected file and its upload lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    /// Integer percentage in [0, 100]. Reaches 100 together with `Success`.
    pub progress: u8,
    pub status: UploadStatus,
    /// Present exactly when `status == Error`.
    pub error: Option<String>,
}

impl QueuedFile {
    pub(crate) fn new(id: FileId, name: String, size: u64) -> Self {
        Self {
            id,
            name,
            size,
            progress: 0,
            status: UploadStatus::Pending,
            error: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == UploadStatus::Pending
    }

    pub fn is_uploading(&self) -> bool {
        self.status == UploadStatus::Uploading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_pending_at_zero() {
        let record = QueuedFile::new(FileId::new(), "session.dat".to_string(), 42);
        assert!(record.is_pending());
        assert_eq!(record.progress, 0);
        assert!(record.error.is_none());
    }

    #[test]
    fn file_ids_are_unique() {
        assert_ne!(FileId::new(), FileId::new());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&UploadStatus::Uploading).unwrap();
        assert_eq!(json, "\"uploading\"");
    }
}
