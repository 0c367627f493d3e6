//! # Concept Taxonomies
//!
//! Anatomical concept trees for the atlas: loading relation records from
//! disk, building the immutable-after-load tree structure, and persisting
//! precomputed snapshots so startup can skip the relation ingestion.

pub mod snapshot;
pub mod source;
pub mod tree;

pub use snapshot::SnapshotError;
pub use tree::{ConceptNode, ConceptTree, NodeId, Relation, TreeError};
