//! Flat-file persistence for per-user worlds: one directory per user id
//! under the saves root, one pretty-printed JSON file per world.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;

pub struct WorldFileStore {
    root: PathBuf,
}

impl WorldFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filenames for the user's saved worlds, sorted. A user without a
    /// folder yet simply has no worlds.
    pub async fn list(&self, user_id: &str) -> Result<Vec<String>> {
        let dir = self.user_dir(user_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("reading {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn load(&self, user_id: &str, filename: &str) -> Result<Option<Value>> {
        let path = self.user_dir(user_id).join(filename);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(value))
    }

    /// Persist the body verbatim (pretty-printed), creating the user's
    /// folder on first save.
    pub async fn save(&self, user_id: &str, filename: &str, world: &Value) -> Result<()> {
        let dir = self.user_dir(user_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(filename);
        let json = serde_json::to_vec_pretty(world)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Remove a saved world. Returns whether it existed.
    pub async fn delete(&self, user_id: &str, filename: &str) -> Result<bool> {
        let path = self.user_dir(user_id).join(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("deleting {}", path.display())),
        }
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.root.join(user_id)
    }
}

/// Filenames arrive from the URL path; only plain `.json` names are
/// accepted, never path separators or traversal.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name.ends_with(".json")
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, WorldFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldFileStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn save_load_list_delete_round_trip() {
        let (_dir, store) = store();
        let world = json!({ "name": "Eldoria", "countries": [] });

        assert!(store.list("user-1").await.unwrap().is_empty());

        store.save("user-1", "Eldoria.json", &world).await.unwrap();
        store
            .save("user-1", "Valmere.json", &json!({ "name": "Valmere" }))
            .await
            .unwrap();

        assert_eq!(
            store.list("user-1").await.unwrap(),
            vec!["Eldoria.json", "Valmere.json"]
        );

        let loaded = store.load("user-1", "Eldoria.json").await.unwrap().unwrap();
        assert_eq!(loaded, world);

        assert!(store.delete("user-1", "Eldoria.json").await.unwrap());
        assert!(!store.delete("user-1", "Eldoria.json").await.unwrap());
        assert_eq!(store.list("user-1").await.unwrap(), vec!["Valmere.json"]);
    }

    #[tokio::test]
    async fn users_do_not_see_each_other() {
        let (_dir, store) = store();
        store
            .save("user-1", "Eldoria.json", &json!({ "name": "Eldoria" }))
            .await
            .unwrap();
        assert!(store.list("user-2").await.unwrap().is_empty());
        assert!(store.load("user-2", "Eldoria.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_world_loads_as_none() {
        let (_dir, store) = store();
        assert!(store.load("user-1", "nope.json").await.unwrap().is_none());
    }

    #[test]
    fn filename_validation() {
        assert!(is_safe_filename("Eldoria.json"));
        assert!(is_safe_filename("The_Sunken_Coast.json"));
        assert!(!is_safe_filename("nope.png"));
        assert!(!is_safe_filename("../escape.json"));
        assert!(!is_safe_filename("a/b.json"));
        assert!(!is_safe_filename(""));
    }
}
