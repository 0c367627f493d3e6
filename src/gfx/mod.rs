//! # Graphics
//!
//! Rendering support for the atlas viewport: orbit camera, the render
//! scene mirroring the mesh registry, and the wgpu engine with its single
//! forward pipeline. The selection core never calls into this module; the
//! application applies canonical deltas to scene highlight state each
//! frame.

pub mod camera;
pub mod render_engine;
pub mod scene;
pub mod vertex;

pub use camera::{CameraController, CameraManager, OrbitCamera};
pub use render_engine::RenderEngine;
pub use scene::Scene;
