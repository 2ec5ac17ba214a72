//! The active world session: one document, one filename, one source tag.
//!
//! Every mutation goes through the session so the mirror and the dirty
//! flag stay in step with the in-memory document. Flushes are one-shot;
//! a failure leaves the document exactly as it was.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use worldforge_common::{
    Config, MapMeta, MapPin, PinType, StorageSource, WorldDocument, WorldForgeError,
};

use crate::backends::{LocalExport, RemoteEntry, RemoteStore};
use crate::dirty::{DirtyTracker, SaveStatus};
use crate::mirror::{KvStore, Mirror};

/// Session tunables, usually taken from the application [`Config`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_document_bytes: usize,
    pub max_raster_bytes: usize,
    pub export_dir: PathBuf,
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_document_bytes: config.max_document_bytes,
            max_raster_bytes: config.max_raster_bytes,
            export_dir: config.export_dir.clone(),
        }
    }
}

pub struct WorldSession<S: KvStore> {
    world: WorldDocument,
    filename: String,
    source: StorageSource,
    tracker: DirtyTracker,
    mirror: Mirror<S>,
    export: LocalExport,
    remote: Option<Arc<dyn RemoteStore>>,
    config: SessionConfig,
}

impl<S: KvStore> std::fmt::Debug for WorldSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldSession")
            .field("filename", &self.filename)
            .field("source", &self.source)
            .field("tracker", &self.tracker)
            .field("remote", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: KvStore> WorldSession<S> {
    /// Start a fresh world. The document is mirrored right away and marked
    /// dirty so the first flush persists it.
    pub fn create(name: &str, mirror: Mirror<S>, config: SessionConfig) -> Self {
        let world = WorldDocument::new(name);
        let filename = world.derived_filename();
        let mut session = Self::assemble(world, filename, StorageSource::Local, mirror, config);
        session.touch();
        session
    }

    /// Resume whatever the previous page left in the mirror.
    pub fn resume(mirror: Mirror<S>, config: SessionConfig) -> Option<Self> {
        let snapshot = mirror.retrieve()?;
        Some(Self::assemble(
            snapshot.world,
            snapshot.filename,
            snapshot.source,
            mirror,
            config,
        ))
    }

    /// Import a world from raw JSON (a previously exported file).
    pub fn import(
        json: &str,
        mirror: Mirror<S>,
        config: SessionConfig,
    ) -> Result<Self, WorldForgeError> {
        let world: WorldDocument = serde_json::from_str(json)?;
        let filename = world.derived_filename();
        let mut session = Self::assemble(world, filename, StorageSource::Local, mirror, config);
        session.touch();
        Ok(session)
    }

    fn assemble(
        world: WorldDocument,
        filename: String,
        source: StorageSource,
        mirror: Mirror<S>,
        config: SessionConfig,
    ) -> Self {
        let export = LocalExport::new(config.export_dir.clone());
        Self {
            world,
            filename,
            source,
            tracker: DirtyTracker::new(),
            mirror,
            export,
            remote: None,
            config,
        }
    }

    /// Attach the remote store once a credential is available. Without one,
    /// every Drive operation fails locally with `NotAuthenticated`.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    // --- Accessors ---

    pub fn world(&self) -> &WorldDocument {
        &self.world
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn source(&self) -> StorageSource {
        self.source
    }

    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty()
    }

    pub fn status(&self) -> SaveStatus {
        self.tracker.status()
    }

    pub fn mirror(&self) -> &Mirror<S> {
        &self.mirror
    }

    // --- Mutation ---

    /// Apply an arbitrary edit to the document, then mirror and mark dirty.
    pub fn edit(&mut self, f: impl FnOnce(&mut WorldDocument)) {
        f(&mut self.world);
        self.touch();
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.world.summary = summary.into();
        self.touch();
    }

    pub fn set_in_world_date(&mut self, date: impl Into<String>) {
        self.world.in_world_date = date.into();
        self.touch();
    }

    /// Rename the world. The tracked filename is fixed at creation/load
    /// time; saves keep targeting it.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.world.name = name.into();
        self.touch();
    }

    pub fn add_bookmark(&mut self, text: impl Into<String>) {
        self.world.add_bookmark(text);
        self.touch();
    }

    pub fn remove_bookmark(&mut self, index: usize) -> Option<String> {
        let removed = self.world.remove_bookmark(index);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn push_map_pin(&mut self, pin: MapPin) {
        self.world.push_map_pin(pin);
        self.touch();
    }

    pub fn update_map_pin(
        &mut self,
        id: &str,
        name: String,
        kind: PinType,
        note: Option<String>,
    ) -> bool {
        let updated = self.world.update_map_pin(id, name, kind, note);
        if updated {
            self.touch();
        }
        updated
    }

    pub fn remove_map_pin(&mut self, id: &str) -> bool {
        let removed = self.world.remove_map_pin(id);
        if removed {
            self.touch();
        }
        removed
    }

    /// Replace the map raster descriptor. Destructive: existing pins and
    /// regions are cleared in the same operation, so callers confirm with
    /// the user first. Oversized rasters are rejected before any mutation.
    pub fn attach_map(
        &mut self,
        meta: MapMeta,
        raster_bytes: usize,
    ) -> Result<(), WorldForgeError> {
        if raster_bytes > self.config.max_raster_bytes {
            return Err(WorldForgeError::Oversize {
                size: raster_bytes,
                limit: self.config.max_raster_bytes,
            });
        }
        self.world.attach_map(meta);
        self.touch();
        Ok(())
    }

    // --- Flushing ---

    /// Explicit save to Drive. On success the remote id is carried onto the
    /// document and the source tag moves (and stays) on `drive`.
    pub async fn save_to_drive(&mut self) -> Result<String, WorldForgeError> {
        match self.remote_save_once().await {
            Ok(file_id) => {
                self.tracker.settle(true);
                self.mirror.store(&self.world, &self.filename, self.source);
                Ok(file_id)
            }
            Err(e) => {
                self.tracker.note_failure();
                Err(e)
            }
        }
    }

    /// One timer tick. No-op when clean or when the document is a local
    /// file (no background write target). Otherwise one Drive attempt;
    /// the dirty flag clears whether or not it lands.
    pub async fn autosave_tick(&mut self) {
        if !self.tracker.is_dirty() {
            return;
        }
        match self.source {
            StorageSource::Local => {}
            StorageSource::Drive => match self.remote_save_once().await {
                Ok(_) => {
                    self.tracker.settle(true);
                    self.mirror.store(&self.world, &self.filename, self.source);
                }
                Err(e) => {
                    warn!(error = %e, filename = %self.filename, "Auto-save failed, dropping");
                    self.tracker.settle(false);
                }
            },
        }
    }

    /// Best-effort save-before-leaving: one attempt against the current
    /// backend, then the mirror receives the final state for the next page.
    pub async fn flush_on_exit(&mut self) {
        if self.tracker.is_dirty() {
            match self.source {
                StorageSource::Local => match self.export.export(&self.world, &self.filename) {
                    Ok(path) => {
                        tracing::info!(path = %path.display(), "Exported world on exit");
                        self.tracker.settle(true);
                    }
                    Err(e) => {
                        warn!(error = %e, "Exit export failed");
                        self.tracker.settle(false);
                    }
                },
                StorageSource::Drive => match self.remote_save_once().await {
                    Ok(_) => self.tracker.settle(true),
                    Err(e) => {
                        warn!(error = %e, "Exit save failed");
                        self.tracker.settle(false);
                    }
                },
            }
        }
        self.mirror.store(&self.world, &self.filename, self.source);
    }

    /// Export the document as a local download.
    pub fn export_local(&mut self) -> Result<PathBuf, WorldForgeError> {
        let path = self.export.export(&self.world, &self.filename)?;
        self.tracker.settle(true);
        Ok(path)
    }

    /// Save the world, then upload the attached map raster. The raster
    /// upload is only attempted once the document save has completed;
    /// a failed save leaves the raster untransmitted.
    pub async fn save_with_map_upload(
        &mut self,
        raster_name: &str,
        raster: Vec<u8>,
        content_type: &str,
    ) -> Result<String, WorldForgeError> {
        if raster.len() > self.config.max_raster_bytes {
            return Err(WorldForgeError::Oversize {
                size: raster.len(),
                limit: self.config.max_raster_bytes,
            });
        }

        let file_id = self.save_to_drive().await?;

        let remote = self
            .remote
            .clone()
            .ok_or(WorldForgeError::NotAuthenticated)?;
        remote
            .upload_raster(raster_name, raster, content_type)
            .await?;
        Ok(file_id)
    }

    /// Serialize, enforce the size ceiling, and push to the remote store.
    /// Precondition failures reject locally, before any network call.
    async fn remote_save_once(&mut self) -> Result<String, WorldForgeError> {
        let remote = self
            .remote
            .clone()
            .ok_or(WorldForgeError::NotAuthenticated)?;

        let bytes = serde_json::to_vec(&self.world)?;
        if bytes.len() > self.config.max_document_bytes {
            return Err(WorldForgeError::Oversize {
                size: bytes.len(),
                limit: self.config.max_document_bytes,
            });
        }

        let receipt = remote.save(&self.filename, bytes).await?;
        self.world.file_id = Some(receipt.file_id.clone());
        self.source = StorageSource::Drive;
        Ok(receipt.file_id)
    }

    // --- Remote enumeration ---

    /// Load a different world from Drive. A not-found outcome leaves the
    /// currently active document untouched.
    pub async fn load_from_remote(&mut self, file_name: &str) -> Result<(), WorldForgeError> {
        let remote = self
            .remote
            .clone()
            .ok_or(WorldForgeError::NotAuthenticated)?;

        let world = remote.load(file_name).await?;
        self.world = world;
        self.filename = file_name.to_string();
        self.source = StorageSource::Drive;
        self.tracker = DirtyTracker::new();
        self.mirror.store(&self.world, &self.filename, self.source);
        Ok(())
    }

    pub async fn remote_worlds(&self) -> Result<Vec<RemoteEntry>, WorldForgeError> {
        let remote = self
            .remote
            .clone()
            .ok_or(WorldForgeError::NotAuthenticated)?;
        remote.list().await
    }

    /// Best-effort remote delete. Returns whether the remote object is
    /// gone; on failure a warning is surfaced and the caller prunes its
    /// local list regardless.
    pub async fn delete_remote(&self, file_name: &str) -> bool {
        let Some(remote) = self.remote.clone() else {
            warn!(file_name, "No credential, skipping remote delete");
            return false;
        };
        match remote.delete(file_name).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, file_name, "Remote delete failed, pruning locally anyway");
                false
            }
        }
    }

    fn touch(&mut self) {
        self.tracker.mark_dirty();
        self.mirror.store(&self.world, &self.filename, self.source);
    }
}
