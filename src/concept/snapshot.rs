//! Concept tree snapshots
//!
//! Relation ingestion over the full taxonomy files is slow enough to be
//! worth caching: a built tree can be persisted as a RON file keyed by its
//! root concept id and loaded back directly on the next start. A snapshot
//! that is missing or fails to parse degrades to the TSV build path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use super::tree::ConceptTree;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot parse: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("snapshot encode: {0}")]
    Encode(#[from] ron::Error),
}

/// Path of the snapshot for a given root concept inside `dir`.
pub fn snapshot_path(dir: &Path, root_id: &str) -> PathBuf {
    dir.join(format!("{root_id}.ron"))
}

/// Loads the snapshot for `root_id` from `dir`.
pub fn load(dir: &Path, root_id: &str) -> Result<ConceptTree, SnapshotError> {
    let path = snapshot_path(dir, root_id);
    let content = fs::read_to_string(&path)?;
    let tree: ConceptTree = ron::from_str(&content)?;
    info!("loaded tree snapshot {} ({} concepts)", path.display(), tree.len());
    Ok(tree)
}

/// Persists `tree` as the snapshot for `root_id` inside `dir`.
pub fn save(dir: &Path, root_id: &str, tree: &ConceptTree) -> Result<(), SnapshotError> {
    fs::create_dir_all(dir)?;
    let path = snapshot_path(dir, root_id);
    let content = ron::ser::to_string(tree)?;
    fs::write(&path, content)?;
    Ok(())
}

/// Best-effort snapshot write; failures are logged, never fatal.
pub fn save_quietly(dir: &Path, root_id: &str, tree: &ConceptTree) {
    if let Err(err) = save(dir, root_id, tree) {
        warn!("could not write tree snapshot for {root_id}: {err}");
    }
}
