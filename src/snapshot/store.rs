//! JSON-file snapshot store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Snapshot, SnapshotStore};

/// Path for the in-flight write: appends `.tmp` to the snapshot path.
fn temp_path(path: &Path) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(".tmp");
    PathBuf::from(o)
}

/// Default store: one JSON document, written to a temp file and renamed
/// into place so a crash mid-save never leaves a torn snapshot.
///
/// The path is injected by the manager constructor; see
/// `TransferManager::open_at` and `config::default_data_file`.
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> io::Result<Snapshot> {
        let data = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn save(&self, snapshot: &Snapshot) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(snapshot)?;
        let tmp = temp_path(&self.path);
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::SnapshotEntry;
    use super::*;

    fn entry(n: u32) -> SnapshotEntry {
        SnapshotEntry {
            source: format!("ftp://host/file-{}.bin", n),
            destination: format!("file:///downloads/file-{}.bin", n),
            created_at: 1_700_000_000 + n as i64,
        }
    }

    #[test]
    fn temp_path_appends_tmp() {
        let p = temp_path(Path::new("/state/data.json"));
        assert_eq!(p.to_string_lossy(), "/state/data.json.tmp");
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("data.json"));

        let snapshot = Snapshot {
            queue: vec![entry(1), entry(2)],
            history: vec![entry(3)],
        };
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.queue, snapshot.queue);
        assert_eq!(loaded.history, snapshot.history);
        // The temp file must not survive the rename.
        assert!(!temp_path(store.path()).exists());
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("nope.json"));
        assert!(store.load().is_err());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("deep/nested/data.json"));
        store.save(&Snapshot::default()).unwrap();
        assert!(store.path().exists());
        assert!(store.load().unwrap().queue.is_empty());
    }
}
