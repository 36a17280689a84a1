use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{UploadError, UploadResult};

/// Maximum accepted file size: 200 MiB, inclusive.
pub const MAX_FILE_SIZE_BYTES: u64 = 200 * 1024 * 1024;

/// Accepted file extensions, matched case-insensitively as name suffixes.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["xml", "dat", "nrs"];

/// How long an alert stays visible before it is auto-dismissed.
pub const ALERT_DISMISS_MS: u64 = 5000;

/// Value of the `type` form field sent with every upload.
pub const UPLOAD_KIND: &str = "neural-data";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Backend endpoint receiving the multipart POST. Externally supplied.
    pub endpoint_url: String,
    pub max_file_size_bytes: u64,
    pub accepted_extensions: Vec<String>,
    pub alert_dismiss_ms: u64,
    pub request_timeout_secs: u64,
    /// Literal sent as the `type` form field.
    pub upload_kind: String,
}

impl UploaderConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
            accepted_extensions: ACCEPTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            alert_dismiss_ms: ALERT_DISMISS_MS,
            request_timeout_secs: 120,
            upload_kind: UPLOAD_KIND.to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn alert_dismiss(&self) -> Duration {
        Duration::from_millis(self.alert_dismiss_ms)
    }

    pub fn validate(&self) -> UploadResult<()> {
        if self.endpoint_url.trim().is_empty() {
            return Err(UploadError::Config(
                "endpoint_url cannot be empty".to_string(),
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(UploadError::Config(
                "max_file_size_bytes must be greater than 0".to_string(),
            ));
        }

        if self.accepted_extensions.is_empty() {
            return Err(UploadError::Config(
                "at least one accepted extension is required".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(UploadError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constants_match_contract() {
        let config = UploaderConfig::new("http://localhost/upload");
        assert_eq!(config.max_file_size_bytes, 209_715_200);
        assert_eq!(config.accepted_extensions, vec!["xml", "dat", "nrs"]);
        assert_eq!(config.alert_dismiss_ms, 5000);
        assert_eq!(config.upload_kind, "neural-data");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let config = UploaderConfig::new("   ");
        assert!(matches!(config.validate(), Err(UploadError::Config(_))));
    }

    #[test]
    fn zero_size_limit_is_rejected() {
        let mut config = UploaderConfig::new("http://localhost/upload");
        config.max_file_size_bytes = 0;
        assert!(config.validate().is_err());
    }
}
