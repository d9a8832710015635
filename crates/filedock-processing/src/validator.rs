use filedock_core::config::PolicyConfig;
use filedock_core::{AppError, FileCategory};
use std::collections::HashMap;

use crate::classifier::normalize_mime_type;

/// Validation errors for incoming files
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large for {category}: {size} bytes (max: {max} bytes)")]
    FileTooLarge {
        category: FileCategory,
        size: u64,
        max: u64,
    },

    #[error("Invalid content type for {category}: {content_type}")]
    InvalidContentType {
        category: FileCategory,
        content_type: String,
    },

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge {
                category,
                size,
                max,
            } => AppError::OversizedFile {
                category,
                size,
                max,
            },
            ValidationError::InvalidContentType {
                category,
                content_type,
            } => AppError::UnsupportedType {
                category,
                mime_type: content_type,
            },
            ValidationError::EmptyFile => AppError::InvalidInput("File is empty".to_string()),
        }
    }
}

/// Immutable `{category -> (ceiling, allow-list)}` table.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    default_max_file_size: u64,
    max_file_sizes: HashMap<FileCategory, u64>,
    allowed_content_types: HashMap<FileCategory, Vec<String>>,
}

impl UploadPolicy {
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            default_max_file_size: config.default_max_file_size,
            max_file_sizes: config.max_file_sizes.clone(),
            allowed_content_types: config
                .allowed_content_types
                .iter()
                .map(|(category, types)| {
                    (
                        *category,
                        types.iter().map(|t| normalize_mime_type(t)).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Ceiling for a category, falling back to the default ceiling.
    pub fn max_file_size(&self, category: FileCategory) -> u64 {
        self.max_file_sizes
            .get(&category)
            .copied()
            .unwrap_or(self.default_max_file_size)
    }

    /// `None` means the category accepts any content type.
    pub fn allowed_content_types(&self, category: FileCategory) -> Option<&[String]> {
        self.allowed_content_types
            .get(&category)
            .map(|types| types.as_slice())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

/// Checks declared size and content type against an [`UploadPolicy`].
///
/// Runs before any storage write and has no side effects.
#[derive(Debug, Clone)]
pub struct FileValidator {
    policy: UploadPolicy,
}

impl FileValidator {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Validate content type
    pub fn validate_content_type(
        &self,
        category: FileCategory,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let Some(allowed) = self.policy.allowed_content_types(category) else {
            return Ok(());
        };

        let normalized = normalize_mime_type(content_type);
        if !allowed.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::InvalidContentType {
                category,
                content_type: normalized,
            });
        }

        Ok(())
    }

    /// Validate file size
    pub fn validate_file_size(
        &self,
        category: FileCategory,
        size: u64,
    ) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        let max = self.policy.max_file_size(category);
        if size > max {
            return Err(ValidationError::FileTooLarge {
                category,
                size,
                max,
            });
        }

        Ok(())
    }

    /// Content type is checked first, so a mismatched category override is
    /// reported as such even when the payload is also too large.
    pub fn check(
        &self,
        category: FileCategory,
        content_type: &str,
        size: u64,
    ) -> Result<(), ValidationError> {
        self.validate_content_type(category, content_type)?;
        self.validate_file_size(category, size)?;
        Ok(())
    }
}
