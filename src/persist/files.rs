//! File-backed home storage
//!
//! Layout under the store root:
//!
//! ```text
//! homes/<id>.json              current document
//! undo/<id>.json               undo history
//! snapshots/<id>/<snap>.json   immutable snapshots
//! ```
//!
//! # Atomic Writes
//!
//! Writes go to a sibling `*.json.tmp` file which is then renamed over the
//! target, so a reader sees either the old or the new document, never a
//! partial one.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::HomeError;
use crate::store;
use crate::undo::{UndoStack, UndoStackState};
use crate::widget::HomeDoc;

/// Durable storage for home documents, keyed by document id
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn home_path(&self, id: &str) -> PathBuf {
        self.root.join("homes").join(format!("{}.json", encode_id_segment(id)))
    }

    pub(crate) fn undo_path(&self, id: &str) -> PathBuf {
        self.root.join("undo").join(format!("{}.json", encode_id_segment(id)))
    }

    pub(crate) fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.root.join("snapshots").join(encode_id_segment(id))
    }

    /// Load a document
    ///
    /// Missing, unreadable and corrupt documents all come back as `None`.
    pub fn get_home(&self, id: &str) -> Option<HomeDoc> {
        let path = self.home_path(id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read home document");
                return None;
            }
        };
        match store::deserialize(&text) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt home document");
                None
            }
        }
    }

    /// Persist a document atomically
    pub fn put_home(&self, doc: &HomeDoc) -> Result<(), HomeError> {
        let text = store::serialize(doc)?;
        let path = self.home_path(&doc.id);
        write_atomic(&path, text.as_bytes())?;
        info!(home = %doc.id, widgets = doc.widgets.len(), "saved home document");
        Ok(())
    }

    /// Return the stored document, creating and persisting an empty one if absent
    pub fn ensure_home(&self, id: &str, now: DateTime<Utc>) -> Result<HomeDoc, HomeError> {
        if let Some(doc) = self.get_home(id) {
            return Ok(doc);
        }
        let doc = HomeDoc::empty(id, now);
        self.put_home(&doc)?;
        Ok(doc)
    }

    /// Load the undo history for a home, starting fresh when none is stored
    ///
    /// `capacity` replaces whatever capacity the history was stored with, so
    /// lowering it in config trims the oldest frames on the next load.
    pub fn get_undo(&self, id: &str, capacity: usize) -> UndoStack {
        let path = self.undo_path(id);
        let Ok(text) = fs::read_to_string(&path) else {
            return UndoStack::new(capacity);
        };
        match serde_json::from_str::<UndoStackState>(&text) {
            Ok(state) => UndoStack::from_state(UndoStackState { capacity, ..state }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding corrupt undo history");
                UndoStack::new(capacity)
            }
        }
    }

    pub fn put_undo(&self, id: &str, stack: &UndoStack) -> Result<(), HomeError> {
        let text = stack.to_json()?;
        write_atomic(&self.undo_path(id), text.as_bytes())
    }
}

/// Write `bytes` to `path` via a temp file and rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), HomeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| HomeError::storage(parent, e))?;
    }
    let temp = path.with_extension("json.tmp");
    if let Err(e) = fs::write(&temp, bytes) {
        let _ = fs::remove_file(&temp);
        return Err(HomeError::storage(&temp, e));
    }
    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        HomeError::storage(path, e)
    })
}

/// Make an opaque id safe to use as a file name
///
/// Plain `[A-Za-z0-9_-]` ids are used as-is; anything else is hex-encoded
/// behind a `~` prefix so distinct ids never collide.
pub(crate) fn encode_id_segment(id: &str) -> String {
    let plain = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        return id.to_owned();
    }

    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(1 + id.len() * 2);
    out.push('~');
    for &b in id.as_bytes() {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain_id() {
        assert_eq!(encode_id_segment("01HX-abc_9"), "01HX-abc_9");
    }

    #[test]
    fn test_encode_unsafe_id() {
        assert_eq!(encode_id_segment("../x"), "~2e2e2f78");
        assert_eq!(encode_id_segment(""), "~");
    }

    #[test]
    fn test_missing_home_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.get_home("nobody").is_none());
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let doc = HomeDoc::empty("h1", Utc::now());
        store.put_home(&doc).unwrap();
        assert_eq!(store.get_home("h1"), Some(doc));
        assert!(!store.home_path("h1").with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_home_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let path = store.home_path("bad");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(store.get_home("bad").is_none());
    }

    #[test]
    fn test_ensure_home_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let first = store.ensure_home("h2", Utc::now()).unwrap();
        let second = store.ensure_home("h2", Utc::now()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_write_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let original = HomeDoc::empty("h3", Utc::now());
        store.put_home(&original).unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir_all(store.home_path("h3").with_extension("json.tmp")).unwrap();
        let mut changed = original.clone();
        changed.layout_version = 7;
        let err = store.put_home(&changed).unwrap_err();

        assert!(matches!(err, HomeError::Storage { .. }));
        assert_eq!(store.get_home("h3"), Some(original));
    }

    #[test]
    fn test_undo_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut stack = UndoStack::new(4);
        stack.push(crate::undo::UndoFrame::new(serde_json::json!({}), serde_json::json!({}), Utc::now()));
        store.put_undo("h4", &stack).unwrap();
        assert_eq!(store.get_undo("h4", 4), stack);
        assert!(store.get_undo("other", 4).is_empty());
    }

    #[test]
    fn test_undo_load_applies_configured_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut stack = UndoStack::new(4);
        for n in 0..4 {
            stack.push(crate::undo::UndoFrame::new(serde_json::json!({ "n": n }), serde_json::json!({}), Utc::now()));
        }
        store.put_undo("h5", &stack).unwrap();

        let shrunk = store.get_undo("h5", 2);
        assert_eq!(shrunk.capacity(), 2);
        assert_eq!(shrunk.len(), 2);
        assert_eq!(shrunk.pointer(), 2);
        let kept: Vec<_> = shrunk.frames().map(|f| f.patch["n"].clone()).collect();
        assert_eq!(kept, vec![serde_json::json!(2), serde_json::json!(3)]);

        assert_eq!(store.get_undo("h5", 10).capacity(), 10);
    }
}
