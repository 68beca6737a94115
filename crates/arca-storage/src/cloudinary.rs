//! Cloudinary storage implementation
//!
//! Flat CDN media host: no folder hierarchy, objects addressed by public id.
//! All mutating calls are signed with the account's API secret.

use crate::naming;
use crate::traits::{
    LogicalPath, RenameOutcome, StorageError, StorageProvider, StorageResult, UploadOutcome,
};
use arca_core::models::MediaKind;
use arca_core::StorageBackend;
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DELIVERY_BASE: &str = "https://res.cloudinary.com";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct RenameResponse {
    public_id: String,
    secure_url: String,
}

/// Cloudinary-backed provider.
///
/// The file id is the public id `{resource_type}/{stem}`; the first path
/// segment doubles as the resource type for API routing. Renames mint a new
/// public id, so callers must persist the returned id.
#[derive(Clone)]
pub struct CloudinaryProvider {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryProvider {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    /// Resource type is encoded as the first segment of the public id.
    fn resource_type(public_id: &str) -> &str {
        match public_id.split_once('/') {
            Some(("video", _)) => "video",
            _ => "image",
        }
    }

    fn kind_from_content_type(content_type: &str) -> MediaKind {
        if content_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    fn api_url(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            API_BASE, self.cloud_name, resource_type, action
        )
    }

    fn delivery_url(&self, public_id: &str) -> String {
        let resource_type = Self::resource_type(public_id);
        format!(
            "{}/{}/{}/upload/{}",
            DELIVERY_BASE, self.cloud_name, resource_type, public_id
        )
    }

    /// Request signature: SHA-256 over the sorted `k=v` pairs joined with `&`,
    /// with the API secret appended.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<(&str, &str)> = params.to_vec();
        sorted.sort_by_key(|(k, _)| *k);

        let to_sign: String = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn timestamp() -> String {
        chrono::Utc::now().timestamp().to_string()
    }
}

#[async_trait]
impl StorageProvider for CloudinaryProvider {
    async fn upload(
        &self,
        path: &LogicalPath,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadOutcome> {
        let kind = Self::kind_from_content_type(content_type);
        let public_id = naming::public_id(kind, &path.file_name);
        let size = data.len();
        let timestamp = Self::timestamp();

        let signature = self.sign(&[
            ("public_id", &public_id),
            ("signature_algorithm", "sha256"),
            ("timestamp", &timestamp),
        ]);

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(path.file_name.clone())
            .mime_str(content_type)
            .map_err(|e| {
                StorageError::invalid_input(StorageBackend::Cloudinary, "upload", e)
            })?;

        let form = reqwest::multipart::Form::new()
            .text("public_id", public_id.clone())
            .text("signature_algorithm", "sha256")
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .part("file", part);

        let start = std::time::Instant::now();

        let response = self
            .http
            .post(self.api_url(kind.as_str(), "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::Cloudinary, "upload", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(
                StorageBackend::Cloudinary,
                "upload",
                status.as_u16(),
                body,
            ));
        }

        let uploaded: UploadResponse = response.json().await.map_err(|e| {
            StorageError::inconsistent(StorageBackend::Cloudinary, "upload", e)
        })?;

        tracing::info!(
            public_id = %uploaded.public_id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "cloudinary upload successful"
        );

        Ok(UploadOutcome {
            file_id: uploaded.public_id,
            url: uploaded.secure_url,
            backend: StorageBackend::Cloudinary,
            thumbnail_url: None,
        })
    }

    async fn download(&self, file_id: &str) -> StorageResult<Vec<u8>> {
        let url = self.delivery_url(file_id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::Cloudinary, "download", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(
                StorageBackend::Cloudinary,
                "download",
                status.as_u16(),
                body,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::Cloudinary, "download", e))?;

        Ok(bytes.to_vec())
    }

    /// Best-effort: a failed destroy is logged and swallowed so removal flows
    /// never block on CDN cleanup.
    async fn delete(&self, file_id: &str) -> StorageResult<()> {
        let resource_type = Self::resource_type(file_id);
        let timestamp = Self::timestamp();

        let signature = self.sign(&[
            ("public_id", file_id),
            ("signature_algorithm", "sha256"),
            ("timestamp", &timestamp),
        ]);

        let form = reqwest::multipart::Form::new()
            .text("public_id", file_id.to_string())
            .text("signature_algorithm", "sha256")
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        let result = self
            .http
            .post(self.api_url(resource_type, "destroy"))
            .multipart(form)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(public_id = %file_id, "cloudinary delete successful");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    public_id = %file_id,
                    status = status.as_u16(),
                    body = %body,
                    "cloudinary delete failed, continuing"
                );
            }
            Err(e) => {
                tracing::warn!(
                    public_id = %file_id,
                    error = %e,
                    "cloudinary delete request failed, continuing"
                );
            }
        }

        Ok(())
    }

    async fn rename(&self, file_id: &str, new_name: &str) -> StorageResult<RenameOutcome> {
        let resource_type = Self::resource_type(file_id);
        let to_public_id = format!(
            "{}/{}",
            resource_type,
            naming::file_stem(&naming::sanitize_file_name(new_name))
        );
        let timestamp = Self::timestamp();

        let signature = self.sign(&[
            ("from_public_id", file_id),
            ("signature_algorithm", "sha256"),
            ("timestamp", &timestamp),
            ("to_public_id", &to_public_id),
        ]);

        let form = reqwest::multipart::Form::new()
            .text("from_public_id", file_id.to_string())
            .text("to_public_id", to_public_id)
            .text("signature_algorithm", "sha256")
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        let response = self
            .http
            .post(self.api_url(resource_type, "rename"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::Cloudinary, "rename", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(
                StorageBackend::Cloudinary,
                "rename",
                status.as_u16(),
                body,
            ));
        }

        let renamed: RenameResponse = response.json().await.map_err(|e| {
            StorageError::inconsistent(StorageBackend::Cloudinary, "rename", e)
        })?;

        tracing::info!(
            from = %file_id,
            to = %renamed.public_id,
            "cloudinary rename successful"
        );

        Ok(RenameOutcome {
            file_id: renamed.public_id,
            url: Some(renamed.secure_url),
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Cloudinary
    }
}
