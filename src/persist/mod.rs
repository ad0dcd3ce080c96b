//! Durable storage for home documents, undo history and snapshots

pub mod files;
pub mod snapshot;

pub use files::FileStore;
pub use snapshot::SnapshotMeta;
