//! Persistence backends: the local file export and the remote store.
//!
//! The remote side is a trait so the session can be exercised against stub
//! stores; `DriveStore` is the production implementation over the Drive
//! client. Operations are independent, one attempt each, no shared
//! transaction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use drive_client::{DriveClient, DriveError};
use worldforge_common::{WorldDocument, WorldForgeError};

/// A listing entry from the remote application folder.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub name: String,
    pub file_id: String,
    pub created_time: Option<DateTime<Utc>>,
}

/// Returned by a successful remote save. The caller must carry the id
/// back onto the document so later saves update in place.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReceipt {
    pub file_id: String,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn save(&self, file_name: &str, content: Vec<u8>)
        -> Result<SaveReceipt, WorldForgeError>;
    async fn load(&self, file_name: &str) -> Result<WorldDocument, WorldForgeError>;
    async fn list(&self) -> Result<Vec<RemoteEntry>, WorldForgeError>;
    async fn delete(&self, file_name: &str) -> Result<(), WorldForgeError>;
    async fn upload_raster(
        &self,
        file_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<SaveReceipt, WorldForgeError>;
}

/// Remote store backed by the user's Google Drive application folder.
pub struct DriveStore {
    client: DriveClient,
}

impl DriveStore {
    pub fn new(access_token: String) -> Self {
        Self {
            client: DriveClient::new(access_token),
        }
    }
}

#[async_trait]
impl RemoteStore for DriveStore {
    async fn save(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<SaveReceipt, WorldForgeError> {
        let file_id = self
            .client
            .save_json(file_name, content)
            .await
            .map_err(map_drive_err)?;
        Ok(SaveReceipt { file_id })
    }

    async fn load(&self, file_name: &str) -> Result<WorldDocument, WorldForgeError> {
        let value = self
            .client
            .load_json(file_name)
            .await
            .map_err(map_drive_err)?;
        let world = serde_json::from_value(value)?;
        Ok(world)
    }

    async fn list(&self) -> Result<Vec<RemoteEntry>, WorldForgeError> {
        let files = self.client.list_worlds().await.map_err(map_drive_err)?;
        Ok(files
            .into_iter()
            .map(|f| RemoteEntry {
                name: f.name,
                file_id: f.id,
                created_time: f.created_time,
            })
            .collect())
    }

    async fn delete(&self, file_name: &str) -> Result<(), WorldForgeError> {
        self.client
            .delete_by_name(file_name)
            .await
            .map_err(map_drive_err)
    }

    async fn upload_raster(
        &self,
        file_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<SaveReceipt, WorldForgeError> {
        let file_id = self
            .client
            .upload_media(file_name, content, content_type)
            .await
            .map_err(map_drive_err)?;
        Ok(SaveReceipt { file_id })
    }
}

fn map_drive_err(err: DriveError) -> WorldForgeError {
    match err {
        DriveError::NotFound(name) => WorldForgeError::NotFound(name),
        other => WorldForgeError::Remote(other.to_string()),
    }
}

/// The "download" backend: pretty-printed JSON written into an export
/// directory, one file per save.
pub struct LocalExport {
    dir: PathBuf,
}

impl LocalExport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the document synchronously. Exports stay synchronous so the
    /// page-unload flush can complete within the unload window.
    pub fn export(
        &self,
        world: &WorldDocument,
        file_name: &str,
    ) -> Result<PathBuf, WorldForgeError> {
        let json = serde_json::to_vec_pretty(world)?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let export = LocalExport::new(dir.path());
        let world = WorldDocument::new("Eldoria");

        let path = export.export(&world, "Eldoria.json").unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        assert!(raw.contains('\n'), "export should be pretty-printed");

        let parsed: WorldDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, world);
    }

    #[test]
    fn not_found_maps_to_domain_error() {
        let err = map_drive_err(DriveError::NotFound("a.json".to_string()));
        assert!(matches!(err, WorldForgeError::NotFound(name) if name == "a.json"));

        let err = map_drive_err(DriveError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        assert!(matches!(err, WorldForgeError::Remote(_)));
    }
}
