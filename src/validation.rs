use crate::config::UploaderConfig;
use crate::errors::{UploadError, UploadResult};

pub struct FileValidator;

impl FileValidator {
    /// Pure acceptance predicate: the name must end with an accepted
    /// extension (case-insensitive) and the size must not exceed the
    /// configured maximum. The size boundary is inclusive.
    pub fn is_valid_file(name: &str, size: u64, config: &UploaderConfig) -> bool {
        Self::has_accepted_extension(name, config) && size <= config.max_file_size_bytes
    }

    /// Same check, but reports which condition failed. Used for logging;
    /// rejected candidates only surface to the user as an aggregate alert.
    pub fn validate_candidate(name: &str, size: u64, config: &UploaderConfig) -> UploadResult<()> {
        if !Self::has_accepted_extension(name, config) {
            return Err(UploadError::invalid_file_type(name));
        }

        if size > config.max_file_size_bytes {
            return Err(UploadError::file_too_large(
                name,
                size,
                config.max_file_size_bytes,
            ));
        }

        Ok(())
    }

    fn has_accepted_extension(name: &str, config: &UploaderConfig) -> bool {
        let lowered = name.to_lowercase();
        config
            .accepted_extensions
            .iter()
            .any(|ext| lowered.ends_with(&format!(".{}", ext.to_lowercase())))
    }
}
