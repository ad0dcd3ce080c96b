//! Point-in-time snapshots of home documents
//!
//! A snapshot file holds its metadata and a full copy of the document. Files
//! are written once and never rewritten; restoring copies the snapshot into
//! the current document slot.

use std::fs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ulid::Ulid;

use crate::error::{HomeError, ParseError};
use crate::widget::HomeDoc;

use super::files::{encode_id_segment, write_atomic, FileStore};

/// Listing entry for a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub id: String,
    pub home_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub widget_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotFile {
    meta: SnapshotMeta,
    doc: HomeDoc,
}

impl FileStore {
    /// Store an immutable copy of `doc`
    pub fn save_snapshot(
        &self,
        doc: &HomeDoc,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SnapshotMeta, HomeError> {
        let meta = SnapshotMeta {
            id: Ulid::new().to_string(),
            home_id: doc.id.clone(),
            created_at: now,
            note,
            widget_count: doc.widgets.len(),
        };
        let file = SnapshotFile {
            meta: meta.clone(),
            doc: doc.clone(),
        };
        let text = serde_json::to_string_pretty(&file).map_err(ParseError::from)?;
        write_atomic(&self.snapshot_path(&doc.id, &meta.id), text.as_bytes())?;
        info!(home = %doc.id, snapshot = %meta.id, "saved snapshot");
        Ok(meta)
    }

    /// Snapshot metadata for a home, newest first
    pub fn list_snapshots(&self, home_id: &str) -> Result<Vec<SnapshotMeta>, HomeError> {
        let dir = self.snapshot_dir(home_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HomeError::storage(&dir, e)),
        };

        let mut metas = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HomeError::storage(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(|e| HomeError::storage(&path, e))
                .and_then(|text| serde_json::from_str::<SnapshotFile>(&text).map_err(|e| ParseError::from(e).into()))
            {
                Ok(file) => metas.push(file.meta),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable snapshot"),
            }
        }

        metas.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(metas)
    }

    /// Load one snapshot's document
    pub fn load_snapshot(&self, home_id: &str, snapshot_id: &str) -> Result<HomeDoc, HomeError> {
        Ok(self.read_snapshot(home_id, snapshot_id)?.doc)
    }

    pub fn delete_snapshot(&self, home_id: &str, snapshot_id: &str) -> Result<(), HomeError> {
        let path = self.snapshot_path(home_id, snapshot_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(home = %home_id, snapshot = %snapshot_id, "deleted snapshot");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(HomeError::not_found("snapshot", snapshot_id)),
            Err(e) => Err(HomeError::storage(&path, e)),
        }
    }

    /// Make a snapshot the current document and return it
    ///
    /// The snapshot itself is left untouched.
    pub fn restore_snapshot(
        &self,
        home_id: &str,
        snapshot_id: &str,
        now: DateTime<Utc>,
    ) -> Result<HomeDoc, HomeError> {
        let mut doc = self.load_snapshot(home_id, snapshot_id)?;
        doc.id = home_id.to_string();
        doc.updated_at = now;
        self.put_home(&doc)?;
        info!(home = %home_id, snapshot = %snapshot_id, "restored snapshot");
        Ok(doc)
    }

    fn snapshot_path(&self, home_id: &str, snapshot_id: &str) -> std::path::PathBuf {
        self.snapshot_dir(home_id)
            .join(format!("{}.json", encode_id_segment(snapshot_id)))
    }

    fn read_snapshot(&self, home_id: &str, snapshot_id: &str) -> Result<SnapshotFile, HomeError> {
        let path = self.snapshot_path(home_id, snapshot_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HomeError::not_found("snapshot", snapshot_id))
            }
            Err(e) => return Err(HomeError::storage(&path, e)),
        };
        let file: SnapshotFile = serde_json::from_str(&text).map_err(ParseError::from)?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let t0 = Utc::now();
        let doc = HomeDoc::empty("h", t0);

        let old = store.save_snapshot(&doc, Some("first".into()), t0).unwrap();
        let new = store.save_snapshot(&doc, None, t0 + Duration::seconds(5)).unwrap();

        let ids: Vec<_> = store.list_snapshots("h").unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[test]
    fn test_list_without_snapshots_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.list_snapshots("h").unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.delete_snapshot("h", "nope").unwrap_err().is_not_found());
        assert!(store.load_snapshot("h", "nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_restore_leaves_snapshot_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let t0 = Utc::now();
        let doc = HomeDoc::empty("h", t0);
        let snap = store.save_snapshot(&doc, None, t0).unwrap();

        let restored = store.restore_snapshot("h", &snap.id, t0 + Duration::seconds(1)).unwrap();
        assert_eq!(store.get_home("h"), Some(restored.clone()));
        assert_eq!(store.load_snapshot("h", &snap.id).unwrap(), doc);
        assert_ne!(restored.updated_at, doc.updated_at);
    }
}
