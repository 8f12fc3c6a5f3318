//! Cloudinary-backed photo storage using the signed REST upload API.
//!
//! Signatures are SHA-256 over the sorted parameters followed by the API secret, so the
//! Cloudinary account must have SHA-256 request signing enabled.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use super::{PhotoCategory, PhotoStorage, PhotoStorageError, decode_image, strip_data_url};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const ROOT_FOLDER: &str = "employee-attendance";
/// Applied on upload: bound to 800x800 and let Cloudinary pick the quality.
const INCOMING_TRANSFORMATION: &str = "c_limit,h_800,w_800/q_auto";

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

struct Credentials<'a> {
    cloud_name: &'a str,
    api_key: &'a str,
    api_secret: &'a str,
}

pub struct CloudinaryStorage {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn credentials(&self) -> Result<Credentials<'_>, PhotoStorageError> {
        fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, PhotoStorageError> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .ok_or(PhotoStorageError::NotConfigured(name))
        }

        Ok(Credentials {
            cloud_name: require(&self.config.cloud_name, "CLOUDINARY_CLOUD_NAME")?,
            api_key: require(&self.config.api_key, "CLOUDINARY_API_KEY")?,
            api_secret: require(&self.config.api_secret, "CLOUDINARY_API_SECRET")?,
        })
    }

    async fn signed_post<T: DeserializeOwned>(
        &self,
        credentials: &Credentials<'_>,
        action: &str,
        params: BTreeMap<&'static str, String>,
        file: Option<String>,
    ) -> Result<T, PhotoStorageError> {
        let signature = sign(&params, credentials.api_secret);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("api_key", credentials.api_key.to_string()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));
        if let Some(file) = file {
            form.push(("file", file));
        }

        let url = format!("{}/{}/image/{}", API_BASE, credentials.cloud_name, action);
        debug!(url = %url, "Calling Cloudinary");

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PhotoStorageError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(%status, message = %message, action, "Cloudinary rejected the request");
            return Err(PhotoStorageError::Upstream(format!(
                "Cloudinary API error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PhotoStorageError::Upstream(e.to_string()))
    }
}

#[async_trait]
impl PhotoStorage for CloudinaryStorage {
    async fn upload(
        &self,
        photo: &str,
        owner_id: &str,
        category: PhotoCategory,
    ) -> Result<String, PhotoStorageError> {
        decode_image(photo)?;
        let credentials = self.credentials()?;

        let mut params = BTreeMap::new();
        params.insert("folder", format!("{ROOT_FOLDER}/{owner_id}/{category}"));
        params.insert("timestamp", Utc::now().timestamp().to_string());
        params.insert("transformation", INCOMING_TRANSFORMATION.to_string());
        if let Some(preset) = self.config.upload_preset.as_deref().filter(|p| !p.is_empty()) {
            params.insert("upload_preset", preset.to_string());
        }

        let file = format!("data:image/jpeg;base64,{}", strip_data_url(photo).trim());
        let response: UploadResponse = self
            .signed_post(&credentials, "upload", params, Some(file))
            .await?;

        response.secure_url.ok_or_else(|| {
            PhotoStorageError::Upstream("Cloudinary upload succeeded but no URL returned".into())
        })
    }

    async fn delete(&self, reference: &str) -> Result<(), PhotoStorageError> {
        let public_id = public_id_from_url(reference)
            .ok_or_else(|| PhotoStorageError::InvalidReference(reference.to_string()))?;
        let credentials = self.credentials()?;

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id);
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let response: DestroyResponse = self
            .signed_post(&credentials, "destroy", params, None)
            .await?;

        match response.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(PhotoStorageError::Upstream(format!("destroy returned '{other}'"))),
        }
    }
}

fn signature_payload(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(signature_payload(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// `.../image/upload/v1700000000/employee-attendance/<id>/attendance/abc.jpg`
/// becomes `employee-attendance/<id>/attendance/abc`.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, path) = url.split_once("/upload/")?;
    let path = path.split(['?', '#']).next()?;

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.first().is_some_and(|s| is_version(s)) {
        segments.remove(0);
    }

    let last = segments.pop()?;
    let stem = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
    segments.push(stem);

    let public_id = segments.join("/");
    (!public_id.is_empty()).then_some(public_id)
}

fn is_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_drops_version_and_extension() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1700000000/employee-attendance/abc/attendance/x1y2.jpg";
        assert_eq!(
            public_id_from_url(url).as_deref(),
            Some("employee-attendance/abc/attendance/x1y2")
        );
    }

    #[test]
    fn public_id_without_version() {
        let url = "https://res.cloudinary.com/demo/image/upload/folder/photo.png?_a=1";
        assert_eq!(public_id_from_url(url).as_deref(), Some("folder/photo"));
    }

    #[test]
    fn non_cloudinary_urls_have_no_public_id() {
        assert_eq!(public_id_from_url("https://example.com/photo.jpg"), None);
        assert_eq!(public_id_from_url("https://res.cloudinary.com/demo/image/upload/"), None);
    }

    #[test]
    fn signature_uses_sorted_parameters() {
        let mut params = BTreeMap::new();
        params.insert("transformation", INCOMING_TRANSFORMATION.to_string());
        params.insert("timestamp", "1700000000".to_string());
        params.insert("folder", "employee-attendance/abc/attendance".to_string());

        assert_eq!(
            signature_payload(&params),
            "folder=employee-attendance/abc/attendance&timestamp=1700000000&transformation=c_limit,h_800,w_800/q_auto"
        );
        assert_eq!(
            sign(&params, "secret"),
            "2529693ca0a8807e25e370a1a858fa9c5ec8b9cbbd1d2c7241ea31225663974f"
        );
    }

    #[tokio::test]
    async fn missing_configuration_fails_before_any_request() {
        let storage = CloudinaryStorage::new(CloudinaryConfig::default());
        let result = storage
            .upload("/9j/4AAQSkZJRgAB", "abc", PhotoCategory::Attendance)
            .await;
        assert!(matches!(
            result,
            Err(PhotoStorageError::NotConfigured("CLOUDINARY_CLOUD_NAME"))
        ));
    }

    #[tokio::test]
    async fn invalid_image_is_rejected_before_configuration_is_checked() {
        let storage = CloudinaryStorage::new(CloudinaryConfig::default());
        let result = storage.upload("", "abc", PhotoCategory::Attendance).await;
        assert!(matches!(result, Err(PhotoStorageError::InvalidImage(_))));
    }
}
