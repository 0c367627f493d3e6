//! Render scene
//!
//! One scene object per registry mesh, sharing the anatomy's world space
//! (atlas meshes arrive pre-positioned, so every model matrix is the
//! identity until a view transform changes it). Selection highlighting is
//! a per-object color uniform the application flips from canonical deltas.

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::mesh::{MeshHandle, MeshRegistry};

use super::camera::CameraManager;
use super::vertex::Vertex;

/// Base tint for unselected anatomy
pub const BASE_COLOR: [f32; 4] = [0.78, 0.73, 0.68, 1.0];
/// Highlight tint for selected anatomy
pub const HIGHLIGHT_COLOR: [f32; 4] = [0.95, 0.55, 0.15, 1.0];

/// Per-object data as the shader sees it
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

struct ObjectGpu {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// One renderable anatomy mesh
pub struct SceneObject {
    pub handle: MeshHandle,
    pub name: String,
    pub visible: bool,
    pub selected: bool,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    index_count: u32,
    transform: Matrix4<f32>,
    dirty: bool,
    gpu: Option<ObjectGpu>,
}

impl SceneObject {
    fn uniform(&self) -> ObjectUniform {
        let m: &[f32; 16] = self.transform.as_ref();
        ObjectUniform {
            model: [
                [m[0], m[1], m[2], m[3]],
                [m[4], m[5], m[6], m[7]],
                [m[8], m[9], m[10], m[11]],
                [m[12], m[13], m[14], m[15]],
            ],
            color: if self.selected {
                HIGHLIGHT_COLOR
            } else {
                BASE_COLOR
            },
        }
    }
}

/// Everything the viewport draws: camera plus the anatomy objects
pub struct Scene {
    pub camera_manager: CameraManager,
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new(camera_manager: CameraManager) -> Self {
        Self {
            camera_manager,
            objects: Vec::new(),
        }
    }

    /// Mirrors the completed registry into scene objects. Called once,
    /// after mesh loading finishes.
    pub fn build_from_registry(&mut self, registry: &MeshRegistry) {
        self.objects.clear();
        for (handle, mesh) in registry.iter() {
            self.objects.push(SceneObject {
                handle,
                name: mesh.file_id.clone(),
                visible: true,
                selected: false,
                vertices: Vertex::interleave(&mesh.positions, &mesh.normals),
                indices: mesh.indices.clone(),
                index_count: mesh.indices.len() as u32,
                transform: Matrix4::from_scale(1.0),
                dirty: false,
                gpu: None,
            });
        }
    }

    /// Uploads vertex/index/uniform buffers for every object.
    pub fn init_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        object_layout: &wgpu::BindGroupLayout,
    ) {
        for object in &mut self.objects {
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} vertices", object.name)),
                contents: bytemuck::cast_slice(&object.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} indices", object.name)),
                contents: bytemuck::cast_slice(&object.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} uniform", object.name)),
                contents: bytemuck::bytes_of(&object.uniform()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} bind group", object.name)),
                layout: object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            object.gpu = Some(ObjectGpu {
                vertex_buffer,
                index_buffer,
                uniform_buffer,
                bind_group,
            });
        }
    }

    /// Flips highlight state from a membership predicate; marks changed
    /// objects for the next uniform sync.
    pub fn apply_selection(&mut self, is_selected: impl Fn(MeshHandle) -> bool) {
        for object in &mut self.objects {
            let selected = is_selected(object.handle);
            if object.selected != selected {
                object.selected = selected;
                object.dirty = true;
            }
        }
    }

    /// Writes changed object uniforms to the GPU.
    pub fn sync_uniforms(&mut self, queue: &wgpu::Queue) {
        for object in &mut self.objects {
            if !object.dirty {
                continue;
            }
            if let Some(gpu) = &object.gpu {
                queue.write_buffer(
                    &gpu.uniform_buffer,
                    0,
                    bytemuck::bytes_of(&object.uniform()),
                );
            }
            object.dirty = false;
        }
    }

    /// Advances per-frame camera state.
    pub fn update(&mut self, dt: f32) {
        self.camera_manager.camera.ease_focus(dt);
        self.camera_manager.camera.update_view_proj();
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

/// Draw helpers over a render pass, visibility-aware
pub trait DrawScene<'a> {
    fn draw_scene_objects(&mut self, scene: &'a Scene);
}

impl<'a, 'b> DrawScene<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_scene_objects(&mut self, scene: &'b Scene) {
        for object in scene.objects() {
            if !object.visible {
                continue;
            }
            let Some(gpu) = &object.gpu else {
                continue;
            };
            self.set_bind_group(1, &gpu.bind_group, &[]);
            self.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            self.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            self.draw_indexed(0..object.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, OrbitCamera};
    use crate::mesh::MeshData;
    use cgmath::{Vector3, Zero};

    fn scene_with_two_meshes() -> (Scene, MeshRegistry) {
        let mut registry = MeshRegistry::new();
        for file_id in ["f1", "f2"] {
            registry.insert(MeshData {
                file_id: file_id.to_string(),
                positions: vec![0.0; 9],
                normals: vec![0.0; 9],
                indices: vec![0, 1, 2],
                center: [0.0; 3],
                radius: 1.0,
            });
        }
        let camera = OrbitCamera::new(5.0, 0.3, 0.3, Vector3::zero(), 1.0);
        let manager = CameraManager::new(camera, CameraController::new(0.005, 0.1));
        let mut scene = Scene::new(manager);
        scene.build_from_registry(&registry);
        (scene, registry)
    }

    #[test]
    fn test_build_mirrors_registry() {
        let (scene, registry) = scene_with_two_meshes();
        assert_eq!(scene.object_count(), registry.len());
        assert!(scene.objects().all(|o| !o.selected && o.visible));
    }

    #[test]
    fn test_apply_selection_marks_dirty() {
        let (mut scene, registry) = scene_with_two_meshes();
        let chosen = registry.handle("f2").unwrap();

        scene.apply_selection(|h| h == chosen);

        let flags: Vec<(bool, bool)> = scene.objects().map(|o| (o.selected, o.dirty)).collect();
        assert_eq!(flags, vec![(false, false), (true, true)]);
    }
}
