//! # Vesalius Prelude
//!
//! Convenient imports for embedding the viewer or driving the selection
//! core directly:
//!
//! ```no_run
//! use vesalius::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let app = VesaliusApp::new(ViewerConfig::new("data"))?;
//!     app.run();
//!     Ok(())
//! }
//! ```

pub use crate::app::{VesaliusApp, ViewerConfig, ISA_ROOT_ID, PARTOF_ROOT_ID};
pub use crate::command::{Command, CommandManager, FnCommand};
pub use crate::concept::{ConceptNode, ConceptTree, NodeId, Relation, TreeError};
pub use crate::mesh::{MeshHandle, MeshRegistry};
pub use crate::selection::{
    Delta, MeshSelectionSet, SelectionSynchronizer, TreeViewBinding, TreeViewState,
};
