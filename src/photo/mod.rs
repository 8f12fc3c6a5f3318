//! Photo storage collaborator: registration photos and check-in verification photos.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::ImageFormat;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub mod cloudinary;
pub mod memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum PhotoCategory {
    Registration,
    Attendance,
}

#[derive(Debug, Error)]
pub enum PhotoStorageError {
    /// Rejected locally, nothing was sent.
    #[error("Invalid image data: {0}")]
    InvalidImage(&'static str),

    #[error("Invalid photo reference: {0}")]
    InvalidReference(String),

    #[error("Photo storage is not configured: {0} is missing")]
    NotConfigured(&'static str),

    #[error("Photo storage request failed: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Stores a base64 (optionally data-URL) image and returns its public URL.
    async fn upload(
        &self,
        photo: &str,
        owner_id: &str,
        category: PhotoCategory,
    ) -> Result<String, PhotoStorageError>;

    async fn delete(&self, reference: &str) -> Result<(), PhotoStorageError>;
}

/// Drops a `data:image/...;base64,` prefix when present.
pub fn strip_data_url(photo: &str) -> &str {
    match photo.split_once(',') {
        Some((_, data)) => data,
        None => photo,
    }
}

/// Encodings accepted for reference and check-in photos.
const SUPPORTED_FORMATS: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Local payload check run before any remote call.
pub fn decode_image(photo: &str) -> Result<Vec<u8>, PhotoStorageError> {
    if photo.trim().is_empty() {
        return Err(PhotoStorageError::InvalidImage("no image data provided"));
    }

    let data = strip_data_url(photo).trim();
    if data.is_empty() {
        return Err(PhotoStorageError::InvalidImage("empty image data"));
    }

    let bytes = STANDARD
        .decode(data)
        .map_err(|_| PhotoStorageError::InvalidImage("image is not valid base64"))?;

    if bytes.is_empty() {
        return Err(PhotoStorageError::InvalidImage("empty image data"));
    }

    let format = image::guess_format(&bytes)
        .map_err(|_| PhotoStorageError::InvalidImage("unrecognized image format"))?;
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(PhotoStorageError::InvalidImage("unsupported image format"));
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// JPEG SOI marker followed by a JFIF APP0 header.
    const JPEG_HEADER: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01,
    ];

    #[test]
    fn accepts_plain_and_data_url_payloads() {
        assert_eq!(decode_image("/9j/4AAQSkZJRgAB").unwrap(), JPEG_HEADER);
        assert_eq!(
            decode_image("data:image/jpeg;base64,/9j/4AAQSkZJRgAB").unwrap(),
            JPEG_HEADER
        );
    }

    #[test]
    fn rejects_base64_that_is_not_an_image() {
        // "hello"
        assert!(matches!(
            decode_image("aGVsbG8="),
            Err(PhotoStorageError::InvalidImage("unrecognized image format"))
        ));
        // GIF89a is recognized but not accepted
        assert!(matches!(
            decode_image("R0lGODlhAQABAA=="),
            Err(PhotoStorageError::InvalidImage("unsupported image format"))
        ));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(matches!(decode_image(""), Err(PhotoStorageError::InvalidImage(_))));
        assert!(matches!(
            decode_image("data:image/jpeg;base64,"),
            Err(PhotoStorageError::InvalidImage(_))
        ));
        assert!(matches!(
            decode_image("not base64 at all!"),
            Err(PhotoStorageError::InvalidImage(_))
        ));
    }

    #[test]
    fn categories_render_as_folder_names() {
        assert_eq!(PhotoCategory::Registration.to_string(), "registration");
        assert_eq!(PhotoCategory::Attendance.as_ref(), "attendance");
    }
}
