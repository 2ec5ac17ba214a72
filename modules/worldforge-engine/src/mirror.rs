//! Key-value mirror of the active world between page navigations.
//!
//! Models the browser's tab-scoped storage area: the active document, its
//! filename, and its source tag are kept under fixed keys so the next page
//! can resume the session.

use std::collections::HashMap;

use tracing::warn;

use worldforge_common::{StorageSource, WorldDocument};

pub const KEY_WORLD: &str = "currentWorld";
pub const KEY_FILENAME: &str = "worldFilename";
pub const KEY_SOURCE: &str = "currentWorldSource";

/// Storage area scoped to one browser tab/session.
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// What the mirror held for the previous page, if anything.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorSnapshot {
    pub world: WorldDocument,
    pub filename: String,
    pub source: StorageSource,
}

pub struct Mirror<S: KvStore> {
    kv: S,
}

impl<S: KvStore> Mirror<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Persist a serialized copy of the active document under the fixed keys.
    pub fn store(&mut self, world: &WorldDocument, filename: &str, source: StorageSource) {
        match serde_json::to_string(world) {
            Ok(json) => {
                self.kv.set(KEY_WORLD, json);
                self.kv.set(KEY_FILENAME, filename.to_string());
                self.kv.set(KEY_SOURCE, source.as_str().to_string());
            }
            Err(e) => warn!(error = %e, "Could not mirror world"),
        }
    }

    /// The stored world, or `None` when nothing is stored. Corrupt JSON is
    /// logged and treated as absence, never surfaced as an error.
    pub fn retrieve(&self) -> Option<MirrorSnapshot> {
        let raw = self.kv.get(KEY_WORLD)?;
        let world: WorldDocument = match serde_json::from_str(&raw) {
            Ok(world) => world,
            Err(e) => {
                warn!(error = %e, "Stored world is corrupt, treating as absent");
                return None;
            }
        };

        let filename = self
            .kv
            .get(KEY_FILENAME)
            .unwrap_or_else(|| "world.json".to_string());
        let source = self
            .kv
            .get(KEY_SOURCE)
            .and_then(|s| StorageSource::parse(&s))
            .unwrap_or_default();

        Some(MirrorSnapshot {
            world,
            filename,
            source,
        })
    }

    pub fn clear(&mut self) {
        self.kv.remove(KEY_WORLD);
        self.kv.remove(KEY_FILENAME);
        self.kv.remove(KEY_SOURCE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_retrieve_round_trip() {
        let mut mirror = Mirror::new(MemoryStore::new());
        let world = WorldDocument::new("Eldoria");
        mirror.store(&world, "Eldoria.json", StorageSource::Drive);

        let snapshot = mirror.retrieve().expect("snapshot stored");
        assert_eq!(snapshot.world, world);
        assert_eq!(snapshot.filename, "Eldoria.json");
        assert_eq!(snapshot.source, StorageSource::Drive);
    }

    #[test]
    fn empty_store_yields_none() {
        let mirror = Mirror::new(MemoryStore::new());
        assert!(mirror.retrieve().is_none());
    }

    #[test]
    fn corrupt_world_is_treated_as_absent() {
        let mut kv = MemoryStore::new();
        kv.set(KEY_WORLD, "{not json".to_string());
        kv.set(KEY_FILENAME, "broken.json".to_string());
        let mirror = Mirror::new(kv);
        assert!(mirror.retrieve().is_none());
    }

    #[test]
    fn missing_source_defaults_to_local() {
        let mut kv = MemoryStore::new();
        kv.set(
            KEY_WORLD,
            serde_json::to_string(&WorldDocument::new("Eldoria")).unwrap(),
        );
        let mirror = Mirror::new(kv);
        let snapshot = mirror.retrieve().unwrap();
        assert_eq!(snapshot.source, StorageSource::Local);
        assert_eq!(snapshot.filename, "world.json");
    }

    #[test]
    fn clear_removes_everything() {
        let mut mirror = Mirror::new(MemoryStore::new());
        mirror.store(&WorldDocument::new("Eldoria"), "e.json", StorageSource::Local);
        mirror.clear();
        assert!(mirror.retrieve().is_none());
    }
}
