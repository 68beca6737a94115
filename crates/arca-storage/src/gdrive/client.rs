//! Thin client for the Drive v3 REST API.
//!
//! Every method takes the access token explicitly; token lifecycle is the
//! caller's concern.

use crate::gdrive::hierarchy::RemoteFolderApi;
use crate::traits::{StorageError, StorageResult};
use arca_core::StorageBackend;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

const FILE_FIELDS: &str = "id,name,webContentLink,thumbnailLink";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub web_content_link: Option<String>,
    pub thumbnail_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    files: Vec<DriveFile>,
}

/// Single quotes and backslashes must be escaped inside a `q` string literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[derive(Clone, Default)]
pub struct DriveClient {
    http: reqwest::Client,
}

impl DriveClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn check(
        response: reqwest::Response,
        op: &str,
    ) -> StorageResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::from_status(
            StorageBackend::GoogleDrive,
            op,
            status.as_u16(),
            body,
        ))
    }

    /// Upload file content plus metadata in one multipart/related request.
    pub async fn upload_file(
        &self,
        token: &str,
        parent_id: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<DriveFile> {
        let metadata = json!({
            "name": name,
            "parents": [parent_id],
        });

        let metadata_part = reqwest::multipart::Part::text(metadata.to_string())
            .mime_str("application/json; charset=UTF-8")
            .map_err(|e| StorageError::invalid_input(StorageBackend::GoogleDrive, "upload", e))?;

        let media_part = reqwest::multipart::Part::bytes(data)
            .mime_str(content_type)
            .map_err(|e| StorageError::invalid_input(StorageBackend::GoogleDrive, "upload", e))?;

        let form = reqwest::multipart::Form::new()
            .part("metadata", metadata_part)
            .part("media", media_part);

        let url = format!(
            "{}/files?uploadType=multipart&fields={}",
            DRIVE_UPLOAD_BASE, FILE_FIELDS
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::GoogleDrive, "upload", e))?;

        let response = Self::check(response, "upload").await?;

        response.json().await.map_err(|e| {
            StorageError::inconsistent(StorageBackend::GoogleDrive, "upload", e)
        })
    }

    pub async fn get_file(&self, token: &str, file_id: &str) -> StorageResult<DriveFile> {
        let url = format!("{}/files/{}?fields={}", DRIVE_API_BASE, file_id, FILE_FIELDS);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::GoogleDrive, "get", e))?;

        let response = Self::check(response, "get").await?;

        response
            .json()
            .await
            .map_err(|e| StorageError::inconsistent(StorageBackend::GoogleDrive, "get", e))
    }

    /// Fetch the full file content.
    pub async fn download(&self, token: &str, file_id: &str) -> StorageResult<Vec<u8>> {
        let response = self.fetch_media(token, file_id, None).await?;

        let bytes = response.bytes().await.map_err(|e| {
            StorageError::from_request(StorageBackend::GoogleDrive, "download", e)
        })?;

        Ok(bytes.to_vec())
    }

    /// Fetch file content as an unread response, optionally with a Range
    /// header, so the caller can relay the body incrementally.
    pub async fn fetch_media(
        &self,
        token: &str,
        file_id: &str,
        range: Option<&str>,
    ) -> StorageResult<reqwest::Response> {
        let url = format!("{}/files/{}?alt=media", DRIVE_API_BASE, file_id);

        let mut request = self.http.get(&url).bearer_auth(token);
        if let Some(range) = range {
            request = request.header("Range", range);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::GoogleDrive, "download", e))?;

        Self::check(response, "download").await
    }

    /// Fetch an arbitrary URL (thumbnail links) with the bearer token.
    pub async fn fetch_url(&self, token: &str, url: &str) -> StorageResult<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::GoogleDrive, "fetch", e))?;

        Self::check(response, "fetch").await
    }

    /// Idempotent: a 404 from Drive is treated as already deleted.
    pub async fn delete_file(&self, token: &str, file_id: &str) -> StorageResult<()> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);

        let response = self
            .http
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::GoogleDrive, "delete", e))?;

        let status = response.status();
        if status.is_success() || status.as_u16() == 404 {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(StorageError::from_status(
            StorageBackend::GoogleDrive,
            "delete",
            status.as_u16(),
            body,
        ))
    }

    /// Rename keeps the file id stable; only metadata changes.
    pub async fn rename_file(
        &self,
        token: &str,
        file_id: &str,
        new_name: &str,
    ) -> StorageResult<DriveFile> {
        let url = format!("{}/files/{}?fields={}", DRIVE_API_BASE, file_id, FILE_FIELDS);

        let response = self
            .http
            .patch(&url)
            .bearer_auth(token)
            .json(&json!({ "name": new_name }))
            .send()
            .await
            .map_err(|e| StorageError::from_request(StorageBackend::GoogleDrive, "rename", e))?;

        let response = Self::check(response, "rename").await?;

        response
            .json()
            .await
            .map_err(|e| StorageError::inconsistent(StorageBackend::GoogleDrive, "rename", e))
    }
}

#[async_trait]
impl RemoteFolderApi for DriveClient {
    async fn find_child_folder(
        &self,
        token: &str,
        parent_id: &str,
        name: &str,
    ) -> StorageResult<Option<String>> {
        let query = format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            escape_query_value(name),
            escape_query_value(parent_id),
            FOLDER_MIME
        );

        let url = format!(
            "{}/files?q={}&fields=files(id,name)&pageSize=1",
            DRIVE_API_BASE,
            urlencoding::encode(&query)
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                StorageError::from_request(StorageBackend::GoogleDrive, "find-folder", e)
            })?;

        let response = Self::check(response, "find-folder").await?;

        let list: FileList = response.json().await.map_err(|e| {
            StorageError::inconsistent(StorageBackend::GoogleDrive, "find-folder", e)
        })?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(
        &self,
        token: &str,
        parent_id: &str,
        name: &str,
    ) -> StorageResult<String> {
        let body = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent_id],
        });

        let response = self
            .http
            .post(format!("{}/files?fields=id", DRIVE_API_BASE))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                StorageError::from_request(StorageBackend::GoogleDrive, "create-folder", e)
            })?;

        let response = Self::check(response, "create-folder").await?;

        #[derive(Deserialize)]
        struct Created {
            id: String,
        }

        let created: Created = response.json().await.map_err(|e| {
            StorageError::inconsistent(StorageBackend::GoogleDrive, "create-folder", e)
        })?;

        Ok(created.id)
    }
}
