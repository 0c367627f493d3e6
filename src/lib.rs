// src/lib.rs
//! Vesalius Anatomy Atlas
//!
//! A desktop viewer for human-anatomy 3D models built on wgpu and winit:
//! two synchronized taxonomy trees, a mesh selection core with undo/redo,
//! and an imgui panel layer over a forward-rendered viewport.

pub mod app;
pub mod command;
pub mod concept;
pub mod gfx;
pub mod logwatch;
pub mod mesh;
pub mod prefs;
pub mod prelude;
pub mod selection;
pub mod ui;

// Re-export main types for convenience
pub use app::{VesaliusApp, ViewerConfig};

/// Creates a viewer for the given data directory
pub fn viewer(data_dir: impl Into<std::path::PathBuf>) -> anyhow::Result<VesaliusApp> {
    VesaliusApp::new(ViewerConfig::new(data_dir))
}
