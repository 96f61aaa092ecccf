//! Inline image validation
//!
//! Images travel inside JSON bodies as data URLs
//! (`data:<mime>;base64,<payload>`) and are stored as received.

use data_encoding::BASE64;

use crate::config::UploadConfig;
use crate::services::error::{ServiceError, ServiceResult};

/// Checks data-URL images against the upload settings
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    config: UploadConfig,
}

impl ImagePolicy {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Validate an optional image field.
    ///
    /// Blank strings count as "no image".
    pub fn check(&self, field: &str, value: Option<String>) -> ServiceResult<Option<String>> {
        let value = match value {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => return Ok(None),
        };

        let (mime, payload) = split_data_url(&value).ok_or_else(|| {
            ServiceError::Validation(format!("{} must be a base64 data URL", field))
        })?;

        if !self.config.is_type_allowed(mime) {
            return Err(ServiceError::Validation(format!(
                "Invalid image type: {}. Allowed types: {:?}",
                mime, self.config.allowed_types
            )));
        }

        let len = BASE64
            .decode_len(payload.len())
            .map_err(|_| ServiceError::Validation(format!("{} is not valid base64", field)))?;
        if len > self.config.max_image_bytes + 2 {
            return Err(self.too_large());
        }

        let decoded = BASE64
            .decode(payload.as_bytes())
            .map_err(|_| ServiceError::Validation(format!("{} is not valid base64", field)))?;
        if decoded.len() > self.config.max_image_bytes {
            return Err(self.too_large());
        }

        Ok(Some(value))
    }

    fn too_large(&self) -> ServiceError {
        ServiceError::Validation(format!(
            "Image too large. Maximum size: {} bytes ({} MB)",
            self.config.max_image_bytes,
            self.config.max_image_bytes / 1024 / 1024
        ))
    }
}

/// Split `data:<mime>;base64,<payload>` into mime and payload
fn split_data_url(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    if mime.is_empty() {
        return None;
    }
    Some((mime, payload))
}
