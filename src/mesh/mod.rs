//! # Mesh Registry
//!
//! Owns every renderable mesh for the session and maps file ids to opaque
//! [`MeshHandle`]s. The selection core only ever holds handles; geometry
//! stays here. Loading runs in parallel across independent .obj files with
//! results merged back on the UI thread, so by the time any tree view is
//! bound the registry is complete and immutable.

pub mod loader;

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryIter};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use log::warn;

/// Opaque reference to a renderable mesh owned by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub(crate) u32);

/// CPU-side mesh geometry plus the bounds used for camera framing
#[derive(Debug, Clone)]
pub struct MeshData {
    pub file_id: String,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
    pub center: [f32; 3],
    pub radius: f32,
}

/// File id -> mesh mapping for one session
#[derive(Debug, Default)]
pub struct MeshRegistry {
    meshes: Vec<MeshData>,
    by_file_id: HashMap<String, MeshHandle>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a loaded mesh; re-registering a file id replaces nothing
    /// and returns the existing handle.
    pub fn insert(&mut self, mesh: MeshData) -> MeshHandle {
        if let Some(existing) = self.by_file_id.get(&mesh.file_id) {
            warn!("mesh {} registered twice, keeping first", mesh.file_id);
            return *existing;
        }
        let handle = MeshHandle(self.meshes.len() as u32);
        self.by_file_id.insert(mesh.file_id.clone(), handle);
        self.meshes.push(mesh);
        handle
    }

    /// Resolves a file id; `None` simply means the mesh is not loaded in
    /// this session.
    pub fn handle(&self, file_id: &str) -> Option<MeshHandle> {
        self.by_file_id.get(file_id).copied()
    }

    pub fn mesh(&self, handle: MeshHandle) -> &MeshData {
        &self.meshes[handle.0 as usize]
    }

    pub fn file_id(&self, handle: MeshHandle) -> &str {
        &self.meshes[handle.0 as usize].file_id
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshHandle, &MeshData)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(i, m)| (MeshHandle(i as u32), m))
    }
}

/// One result from the background mesh loading pool
#[derive(Debug)]
pub enum LoadEvent {
    Loaded(MeshData),
    Failed(PathBuf),
}

/// Parallel .obj loader
///
/// Worker threads drain a shared path queue and push results over a
/// channel; the UI thread merges them into the registry between frames and
/// derives `(loaded, total)` progress from the event count.
pub struct BulkLoader {
    rx: Receiver<LoadEvent>,
    total: usize,
    received: usize,
}

impl BulkLoader {
    pub fn spawn(paths: Vec<PathBuf>) -> Self {
        let total = paths.len();
        let (tx, rx) = mpsc::channel();
        let queue = Arc::new(Mutex::new(VecDeque::from(paths)));

        let workers = thread::available_parallelism().map_or(2, |n| n.get()).min(8);
        for _ in 0..workers.max(1) {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            thread::spawn(move || loop {
                let path = match queue.lock().unwrap().pop_front() {
                    Some(path) => path,
                    None => break,
                };
                let event = match loader::load_obj(&path) {
                    Ok(mesh) => LoadEvent::Loaded(mesh),
                    Err(err) => {
                        warn!("failed to load {}: {err}", path.display());
                        LoadEvent::Failed(path)
                    }
                };
                if tx.send(event).is_err() {
                    break;
                }
            });
        }

        Self {
            rx,
            total,
            received: 0,
        }
    }

    /// Drains results that arrived since the last call.
    pub fn drain(&mut self) -> Vec<LoadEvent> {
        let events: Vec<LoadEvent> = self.collect_pending().collect();
        self.received += events.len();
        events
    }

    fn collect_pending(&self) -> TryIter<'_, LoadEvent> {
        self.rx.try_iter()
    }

    /// `(loaded, total)` progress
    pub fn progress(&self) -> (usize, usize) {
        (self.received, self.total)
    }

    pub fn is_done(&self) -> bool {
        self.received >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(file_id: &str) -> MeshData {
        MeshData {
            file_id: file_id.to_string(),
            positions: vec![0.0, 0.0, 0.0],
            normals: vec![0.0, 0.0, 1.0],
            indices: vec![],
            center: [0.0; 3],
            radius: 0.0,
        }
    }

    #[test]
    fn test_insert_and_resolve() {
        let mut registry = MeshRegistry::new();
        let handle = registry.insert(mesh("f_heart"));
        assert_eq!(registry.handle("f_heart"), Some(handle));
        assert_eq!(registry.file_id(handle), "f_heart");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_file_id_is_none() {
        let registry = MeshRegistry::new();
        assert_eq!(registry.handle("missing"), None);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = MeshRegistry::new();
        let first = registry.insert(mesh("f_heart"));
        let second = registry.insert(mesh("f_heart"));
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bulk_loader_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f_cube.obj");
        std::fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .unwrap();

        let mut loader = BulkLoader::spawn(vec![path, dir.path().join("missing.obj")]);
        let mut events = Vec::new();
        while !loader.is_done() {
            events.extend(loader.drain());
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(loader.progress(), (2, 2));
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, LoadEvent::Loaded(m) if m.file_id == "f_cube")));
        assert!(events.iter().any(|e| matches!(e, LoadEvent::Failed(_))));
    }
}
