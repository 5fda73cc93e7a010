//! Repository layer for database operations

pub mod snapshots;

pub use snapshots::SnapshotCache;
