//! Uploaded image payloads and their acceptance rules.

use bytes::Bytes;

use super::validation::ValidationErrors;

/// Largest accepted image, in bytes (2048 KiB).
pub const MAX_IMAGE_BYTES: usize = 2048 * 1024;

/// Accepted image types as MIME essence strings.
const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// An image blob received from a client, not yet persisted.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data,
        }
    }

    /// Effective MIME type: the declared type unless it is missing or generic,
    /// otherwise a guess from the file extension.
    pub fn mime_type(&self) -> Option<String> {
        let declared = self
            .content_type
            .as_deref()
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty() && value != "application/octet-stream");

        declared.or_else(|| {
            mime_guess::from_path(&self.filename)
                .first()
                .map(|mime| mime.essence_str().to_string())
        })
    }
}

/// Check the image against the accepted types and size limit.
pub fn validate_image(upload: &ImageUpload) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if upload.data.is_empty() {
        errors.add("image", "The image failed to upload.");
        return Err(errors);
    }

    let accepted = upload
        .mime_type()
        .is_some_and(|mime| ALLOWED_IMAGE_TYPES.contains(&mime.as_str()));
    if !accepted {
        errors.add(
            "image",
            "The image must be a file of type: jpeg, png, jpg, gif, webp.",
        );
    }

    if upload.data.len() > MAX_IMAGE_BYTES {
        errors.add(
            "image",
            format!(
                "The image may not be greater than {} kilobytes.",
                MAX_IMAGE_BYTES / 1024
            ),
        );
    }

    errors.finish(|| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: Option<&str>, len: usize) -> ImageUpload {
        ImageUpload::new(
            name,
            content_type.map(str::to_string),
            Bytes::from(vec![0_u8; len]),
        )
    }

    #[test]
    fn accepts_common_image_types() {
        assert!(validate_image(&upload("cover.jpg", None, 10)).is_ok());
        assert!(validate_image(&upload("cover.webp", None, 10)).is_ok());
        assert!(validate_image(&upload("cover", Some("image/png"), 10)).is_ok());
    }

    #[test]
    fn rejects_other_types() {
        let errors = validate_image(&upload("notes.txt", None, 10)).expect_err("rejected");
        assert!(errors.contains("image"));

        let errors =
            validate_image(&upload("cover.png", Some("application/pdf"), 10)).expect_err("pdf");
        assert!(errors.contains("image"));
    }

    #[test]
    fn rejects_oversized_and_empty_payloads() {
        assert!(validate_image(&upload("cover.png", None, MAX_IMAGE_BYTES + 1)).is_err());
        assert!(validate_image(&upload("cover.png", None, MAX_IMAGE_BYTES)).is_ok());
        assert!(validate_image(&upload("cover.png", None, 0)).is_err());
    }
}
