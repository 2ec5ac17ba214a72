pub mod error;
pub mod types;

pub use error::{DriveError, Result};
pub use types::DriveFile;

use std::time::Duration;

use serde_json::Value;

use types::{CreateFile, CreatedFile, FileList};

const BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Dedicated folder holding all world files and map images for the app.
/// Created on first use if absent.
const APP_FOLDER_NAME: &str = "WorldForge";

/// Reserved bookkeeping object, excluded from world listings.
const INDEX_SENTINEL: &str = "index.json";

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const JSON_MIME: &str = "application/json";

pub struct DriveClient {
    client: reqwest::Client,
    token: String,
}

impl DriveClient {
    pub fn new(token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, token }
    }

    /// Resolve the application folder's id, creating the folder on first use.
    pub async fn app_folder_id(&self) -> Result<String> {
        let q = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query(APP_FOLDER_NAME),
            FOLDER_MIME
        );
        let list = self.query_files(&q).await?;
        if let Some(folder) = list.files.into_iter().next() {
            return Ok(folder.id);
        }

        tracing::info!(folder = APP_FOLDER_NAME, "Creating application folder");
        let body = CreateFile {
            name: APP_FOLDER_NAME,
            mime_type: Some(FOLDER_MIME),
            parents: None,
        };
        let resp = self
            .client
            .post(format!("{BASE_URL}/files?fields=id"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let created: CreatedFile = self.parse_ok(resp).await?;
        Ok(created.id)
    }

    /// Look up a file by exact name inside the application folder.
    pub async fn find_by_name(&self, file_name: &str) -> Result<Option<DriveFile>> {
        let folder_id = self.app_folder_id().await?;
        self.find_in_folder(&folder_id, file_name).await
    }

    /// Upsert a world document by filename. Duplicate avoidance is by name
    /// lookup inside the application folder: if a file with this name already
    /// exists its content is replaced, otherwise a new file is created.
    /// Returns the remote file id either way.
    pub async fn save_json(&self, file_name: &str, content: Vec<u8>) -> Result<String> {
        self.upload_media(file_name, content, JSON_MIME).await
    }

    /// Upsert arbitrary bytes (map rasters) by filename, same flow as
    /// `save_json` but with the caller's content type.
    pub async fn upload_media(
        &self,
        file_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let folder_id = self.app_folder_id().await?;

        let file_id = match self.find_in_folder(&folder_id, file_name).await? {
            Some(existing) => existing.id,
            None => {
                let body = CreateFile {
                    name: file_name,
                    mime_type: None,
                    parents: Some(vec![folder_id.as_str()]),
                };
                let resp = self
                    .client
                    .post(format!("{BASE_URL}/files?fields=id"))
                    .bearer_auth(&self.token)
                    .json(&body)
                    .send()
                    .await?;
                let created: CreatedFile = self.parse_ok(resp).await?;
                created.id
            }
        };

        tracing::debug!(file_name, file_id = %file_id, bytes = content.len(), "Uploading content");
        let resp = self
            .client
            .patch(format!("{UPLOAD_URL}/files/{file_id}?uploadType=media"))
            .bearer_auth(&self.token)
            .header("Content-Type", content_type)
            .body(content)
            .send()
            .await?;
        self.ensure_success(resp).await?;

        tracing::info!(file_name, file_id = %file_id, "Saved to Drive");
        Ok(file_id)
    }

    /// Fetch a world document's JSON content by filename.
    pub async fn load_json(&self, file_name: &str) -> Result<Value> {
        let folder_id = self.app_folder_id().await?;
        let file = self
            .find_in_folder(&folder_id, file_name)
            .await?
            .ok_or_else(|| DriveError::NotFound(file_name.to_string()))?;

        let resp = self
            .client
            .get(format!("{BASE_URL}/files/{}?alt=media", file.id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let resp = self.ensure_success(resp).await?;
        let value: Value = resp.json().await?;
        Ok(value)
    }

    /// List world files in the application folder: JSON entries only,
    /// excluding the reserved index sentinel.
    pub async fn list_worlds(&self) -> Result<Vec<DriveFile>> {
        let folder_id = self.app_folder_id().await?;
        let q = format!("'{}' in parents and trashed=false", escape_query(&folder_id));
        let list = self.query_files(&q).await?;
        Ok(list
            .files
            .into_iter()
            .filter(|f| is_world_entry(&f.name))
            .collect())
    }

    /// Delete a file by name. Not-found is reported as an error so callers
    /// can decide whether it matters.
    pub async fn delete_by_name(&self, file_name: &str) -> Result<()> {
        let folder_id = self.app_folder_id().await?;
        let file = self
            .find_in_folder(&folder_id, file_name)
            .await?
            .ok_or_else(|| DriveError::NotFound(file_name.to_string()))?;

        let resp = self
            .client
            .delete(format!("{BASE_URL}/files/{}", file.id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        self.ensure_success(resp).await?;
        tracing::info!(file_name, "Deleted from Drive");
        Ok(())
    }

    async fn find_in_folder(&self, folder_id: &str, file_name: &str) -> Result<Option<DriveFile>> {
        let q = format!(
            "name='{}' and '{}' in parents and trashed=false",
            escape_query(file_name),
            escape_query(folder_id)
        );
        let list = self.query_files(&q).await?;
        Ok(list.files.into_iter().next())
    }

    async fn query_files(&self, q: &str) -> Result<FileList> {
        let resp = self
            .client
            .get(format!("{BASE_URL}/files"))
            .bearer_auth(&self.token)
            .query(&[("q", q), ("fields", "files(id, name, createdTime)")])
            .send()
            .await?;
        self.parse_ok(resp).await
    }

    async fn ensure_success(&self, resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DriveError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    async fn parse_ok<T: serde::de::DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T> {
        let resp = self.ensure_success(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Escape a value for interpolation into a Drive `q` query string.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// World listings carry JSON files only, minus the index sentinel.
fn is_world_entry(name: &str) -> bool {
    name.ends_with(".json") && name != INDEX_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_query("Anne's World"), "Anne\\'s World");
        assert_eq!(escape_query(r"a\b"), r"a\\b");
        assert_eq!(escape_query("plain"), "plain");
    }

    #[test]
    fn world_listing_filter() {
        assert!(is_world_entry("Eldoria.json"));
        assert!(!is_world_entry("index.json"));
        assert!(!is_world_entry("map.png"));
    }
}
