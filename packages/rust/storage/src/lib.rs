//! Content database file: the persisted path to identifier mapping.
//!
//! The database is a single JSON document under the data root:
//!
//! ```json
//! { "type": "database", "database": [ { "guid": "...", "path": "models/a.obj" } ] }
//! ```
//!
//! Loading is strict: a missing file, malformed JSON, a wrong `type` tag or a
//! duplicated path all fail with [`JoyBuildError::DatabaseLoad`]. Entries are
//! written sorted by path.

use std::collections::BTreeMap;
use std::path::Path;

use joybuild_shared::{AssetGuid, DatabaseEntry, JoyBuildError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Type tag of the database document.
pub const DATABASE_TYPE: &str = "database";

#[derive(Debug, Serialize, Deserialize)]
struct DatabaseFile {
    #[serde(rename = "type")]
    kind: String,
    database: Vec<DatabaseEntry>,
}

/// In-memory content database keyed by normalised relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDatabase {
    entries: BTreeMap<String, AssetGuid>,
}

impl ContentDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the database at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            let message = if e.kind() == std::io::ErrorKind::NotFound {
                "file does not exist".to_string()
            } else {
                e.to_string()
            };
            JoyBuildError::database_load(path, message)
        })?;

        let file: DatabaseFile = serde_json::from_str(&content)
            .map_err(|e| JoyBuildError::database_load(path, e.to_string()))?;
        if file.kind != DATABASE_TYPE {
            return Err(JoyBuildError::database_load(
                path,
                format!("unexpected type '{}' (expected '{DATABASE_TYPE}')", file.kind),
            ));
        }

        let mut entries = BTreeMap::new();
        for entry in file.database {
            if entries.insert(entry.path.clone(), entry.guid).is_some() {
                return Err(JoyBuildError::database_load(
                    path,
                    format!("duplicate path '{}'", entry.path),
                ));
            }
        }

        debug!(path = %path.display(), entries = entries.len(), "content database loaded");
        Ok(Self { entries })
    }

    /// Write the database to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = DatabaseFile {
            kind: DATABASE_TYPE.to_string(),
            database: self.entries(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| JoyBuildError::validation(format!("cannot serialize database: {e}")))?;
        std::fs::write(path, json).map_err(|e| JoyBuildError::io(path, e))?;

        debug!(path = %path.display(), entries = self.entries.len(), "content database saved");
        Ok(())
    }

    /// Write an empty database at `path` unless a file is already there.
    /// Returns whether a file was created.
    pub fn create_empty(path: &Path) -> Result<bool> {
        if path.try_exists().map_err(|e| JoyBuildError::io(path, e))? {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| JoyBuildError::io(parent, e))?;
        }
        Self::new().save(path)?;
        info!(path = %path.display(), "created empty content database");
        Ok(true)
    }

    pub fn get(&self, path: &str) -> Option<AssetGuid> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Set the identifier for `path`, returning the previous one.
    pub fn insert(&mut self, path: impl Into<String>, guid: AssetGuid) -> Option<AssetGuid> {
        self.entries.insert(path.into(), guid)
    }

    /// The identifier for `path`, generating a fresh one if it has none.
    /// Returns the identifier and whether it was newly assigned.
    pub fn assign(&mut self, path: &str) -> (AssetGuid, bool) {
        if let Some(guid) = self.get(path) {
            return (guid, false);
        }
        let guid = AssetGuid::new();
        self.entries.insert(path.to_string(), guid);
        (guid, true)
    }

    pub fn remove(&mut self, path: &str) -> Option<AssetGuid> {
        self.entries.remove(path)
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &AssetGuid) -> bool) {
        self.entries.retain(|path, guid| keep(path, guid));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries sorted by path.
    pub fn entries(&self) -> Vec<DatabaseEntry> {
        self.entries
            .iter()
            .map(|(path, guid)| DatabaseEntry {
                guid: *guid,
                path: path.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jb-storage-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn save_then_load_keeps_entries_sorted() {
        let tmp = temp_dir();
        let path = tmp.join("data.db");

        let mut db = ContentDatabase::new();
        let (tex, added) = db.assign("textures/wall.png");
        assert!(added);
        let (model, _) = db.assign("models/cube.obj");
        assert_eq!(db.assign("models/cube.obj"), (model, false));
        db.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["type"], "database");
        assert_eq!(raw["database"][0]["path"], "models/cube.obj");
        assert_eq!(raw["database"][1]["guid"], tex.to_string());

        let loaded = ContentDatabase::load(&path).unwrap();
        assert_eq!(loaded, db);
        assert_eq!(loaded.get("textures/wall.png"), Some(tex));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let tmp = temp_dir();
        let err = ContentDatabase::load(&tmp.join("data.db")).unwrap_err();
        assert!(matches!(err, JoyBuildError::DatabaseLoad { .. }));
        assert!(err.to_string().contains("does not exist"));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_documents_are_load_errors() {
        let tmp = temp_dir();
        let path = tmp.join("data.db");

        for body in [
            "not json",
            r#"{"type":"materials","database":[]}"#,
            r#"{"type":"database"}"#,
            r#"{"type":"database","database":[{"guid":"nope","path":"a.png"}]}"#,
        ] {
            std::fs::write(&path, body).unwrap();
            let err = ContentDatabase::load(&path).unwrap_err();
            assert!(matches!(err, JoyBuildError::DatabaseLoad { .. }), "{body}");
        }

        let guid = AssetGuid::new();
        std::fs::write(
            &path,
            format!(
                r#"{{"type":"database","database":[{{"guid":"{guid}","path":"a.png"}},{{"guid":"{guid}","path":"a.png"}}]}}"#
            ),
        )
        .unwrap();
        let err = ContentDatabase::load(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn create_empty_only_once() {
        let tmp = temp_dir();
        let path = tmp.join("nested/data.db");

        assert!(ContentDatabase::create_empty(&path).unwrap());
        assert!(ContentDatabase::load(&path).unwrap().is_empty());

        let mut db = ContentDatabase::new();
        db.assign("a.png");
        db.save(&path).unwrap();
        assert!(!ContentDatabase::create_empty(&path).unwrap());
        assert_eq!(ContentDatabase::load(&path).unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn retain_and_remove() {
        let mut db = ContentDatabase::new();
        db.assign("a.png");
        db.assign("b.png");
        db.assign("c.obj");
        db.retain(|path, _| path.ends_with(".png"));
        assert_eq!(db.paths().collect::<Vec<_>>(), vec!["a.png", "b.png"]);
        assert!(db.remove("a.png").is_some());
        assert!(!db.contains("a.png"));
    }
}
