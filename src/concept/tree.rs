//! Concept tree data structure
//!
//! An anatomical taxonomy is a tree of concepts, each carrying a stable id,
//! a display name and the ids of the mesh files that render it. Trees are
//! bulk-built once from relation records and treated as read-only by every
//! other component; node references are arena indices into the owning tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a concept tree
#[derive(Debug, Error)]
pub enum TreeError {
    /// The designated root concept never appeared in the relation records.
    /// The whole tree is unavailable; no partial tree is handed out.
    #[error("root concept `{0}` not found in relation records")]
    RootNotFound(String),
}

/// Reference to a node inside one [`ConceptTree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

/// One parent/child relation record from a taxonomy source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub parent_id: String,
    pub parent_name: String,
    pub child_id: String,
    pub child_name: String,
}

/// A single anatomical concept
///
/// `file_ids` links the concept to renderable mesh assets. The data model
/// allows internal nodes to carry file ids, but only leaves ever drive mesh
/// selection. `name` stays mutable for display edits; `id` is the structural
/// identity used by selection mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: String,
    pub name: String,
    pub file_ids: Vec<String>,
    pub children: Vec<NodeId>,
}

impl ConceptNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// An anatomical taxonomy, arena-allocated and immutable after build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptTree {
    nodes: Vec<ConceptNode>,
    root: NodeId,
}

impl ConceptTree {
    /// Builds a tree from relation records and a concept-to-files side table.
    ///
    /// Parent and child stubs are upserted as relations arrive; re-inserting
    /// an id that already exists is a no-op. Fails with
    /// [`TreeError::RootNotFound`] when `root_id` never appeared, in which
    /// case the caller must treat the whole tree as unavailable.
    pub fn build(
        relations: &[Relation],
        file_ids_by_concept: &HashMap<String, Vec<String>>,
        root_id: &str,
    ) -> Result<Self, TreeError> {
        let mut nodes: Vec<ConceptNode> = Vec::new();
        let mut index: HashMap<String, NodeId> = HashMap::new();

        let mut upsert = |nodes: &mut Vec<ConceptNode>, id: &str, name: &str| -> NodeId {
            if let Some(existing) = index.get(id) {
                return *existing;
            }
            let node_id = NodeId(nodes.len());
            nodes.push(ConceptNode {
                id: id.to_string(),
                name: name.to_string(),
                file_ids: file_ids_by_concept.get(id).cloned().unwrap_or_default(),
                children: Vec::new(),
            });
            index.insert(id.to_string(), node_id);
            node_id
        };

        for rel in relations {
            let parent = upsert(&mut nodes, &rel.parent_id, &rel.parent_name);
            let child = upsert(&mut nodes, &rel.child_id, &rel.child_name);
            if !nodes[parent.0].children.contains(&child) {
                nodes[parent.0].children.push(child);
            }
        }

        let root = index
            .get(root_id)
            .copied()
            .ok_or_else(|| TreeError::RootNotFound(root_id.to_string()))?;

        Ok(Self { nodes, root })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ConceptNode {
        &self.nodes[id.0]
    }

    /// Mutable node access for display edits (renaming); the arena shape
    /// and ids never change after build.
    pub fn node_mut(&mut self, id: NodeId) -> &mut ConceptNode {
        &mut self.nodes[id.0]
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_leaf()
    }

    /// Total number of concepts in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by concept id string (linear scan, diagnostic use)
    pub fn find(&self, concept_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.id == concept_id)
            .map(NodeId)
    }

    /// Visits `from` and its subtree parent-first.
    ///
    /// Carries no iterator state, so visits can nest freely.
    pub fn visit_preorder<F>(&self, from: NodeId, visit: &mut F)
    where
        F: FnMut(NodeId, &ConceptNode),
    {
        let node = &self.nodes[from.0];
        visit(from, node);
        for &child in &node.children {
            self.visit_preorder(child, visit);
        }
    }

    /// Visits `from` and its subtree children-first.
    pub fn visit_postorder<F>(&self, from: NodeId, visit: &mut F)
    where
        F: FnMut(NodeId, &ConceptNode),
    {
        let node = &self.nodes[from.0];
        for &child in &node.children {
            self.visit_postorder(child, visit);
        }
        visit(from, node);
    }

    /// Root-to-target path, used to reveal a node in a collapsed view.
    pub fn path_to(&self, target: NodeId) -> Option<Vec<NodeId>> {
        let mut path = Vec::new();
        if self.search_path(self.root, target, &mut path) {
            path.reverse();
            Some(path)
        } else {
            None
        }
    }

    fn search_path(&self, current: NodeId, target: NodeId, path: &mut Vec<NodeId>) -> bool {
        if current == target {
            path.push(current);
            return true;
        }
        for &child in &self.nodes[current.0].children {
            if self.search_path(child, target, path) {
                path.push(current);
                return true;
            }
        }
        false
    }

    /// Newick-style export: leaf -> name, internal -> `(c1,c2,...)name`.
    ///
    /// Diagnostic output only.
    pub fn to_canonical_string(&self) -> String {
        self.format_subtree(self.root)
    }

    fn format_subtree(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        if node.is_leaf() {
            return node.name.clone();
        }
        let children: Vec<String> = node
            .children
            .iter()
            .map(|&c| self.format_subtree(c))
            .collect();
        format!("({}){}", children.join(","), node.name)
    }
}
