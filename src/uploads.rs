//! Descriptors for files already written by the upload layer.

use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_SIZE: i64 = 5 * 1024 * 1024;

/// Image types accepted for avatars, gallery photos and screenshots.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// A stored file as reported by the upload layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub mimetype: String,
    pub size: i64,
}

impl StoredFile {
    /// Check that the file is a supported image within the size limit.
    pub fn validate_image(&self) -> Result<(), ApiError> {
        if self.path.trim().is_empty() {
            return Err(ApiError::bad_request("File path is required"));
        }
        if !ALLOWED_IMAGE_TYPES.contains(&self.mimetype.as_str()) {
            return Err(ApiError::bad_request(
                "Only JPEG, PNG, GIF and WebP images are allowed",
            ));
        }
        if self.size <= 0 || self.size > MAX_IMAGE_SIZE {
            return Err(ApiError::bad_request("Image must be at most 5 MB"));
        }
        Ok(())
    }
}
