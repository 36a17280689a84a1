use thiserror::Error;

/// Fallback message used when a transport failure carries no usable detail.
pub const FALLBACK_UPLOAD_MESSAGE: &str = "Upload failed";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid file type: {name}. Only .xml, .dat and .nrs files are supported.")]
    InvalidFileType { name: String },

    #[error("File too large: {name} ({size} bytes, maximum {max} bytes)")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("Unknown file record: {id}")]
    UnknownRecord { id: uuid::Uuid },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Custom result type
pub type UploadResult<T> = Result<T, UploadError>;

impl UploadError {
    pub fn invalid_file_type(name: &str) -> Self {
        Self::InvalidFileType {
            name: name.to_string(),
        }
    }

    pub fn file_too_large(name: &str, size: u64, max: u64) -> Self {
        Self::FileTooLarge {
            name: name.to_string(),
            size,
            max,
        }
    }

    pub fn upload_failed(reason: &str) -> Self {
        Self::UploadFailed {
            reason: reason.to_string(),
        }
    }

    /// Human-readable message for a terminal upload failure.
    ///
    /// The transport does not guarantee a detail string, but every failed
    /// record must carry one, so defaulting happens here at the boundary
    /// rather than in display code.
    pub fn transport_message(&self) -> String {
        let message = match self {
            UploadError::UploadFailed { reason } => reason.clone(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            FALLBACK_UPLOAD_MESSAGE.to_string()
        } else {
            message
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            UploadError::InvalidFileType { .. } | UploadError::FileTooLarge { .. }
        )
    }
}
