//! GPU vertex layout for anatomy meshes

/// One mesh vertex: position and normal, tightly packed for the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Interleaves flat position/normal arrays as produced by the loader.
    pub fn interleave(positions: &[f32], normals: &[f32]) -> Vec<Vertex> {
        positions
            .chunks_exact(3)
            .zip(normals.chunks_exact(3))
            .map(|(p, n)| Vertex {
                position: [p[0], p[1], p[2]],
                normal: [n[0], n[1], n[2]],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_pairs_up() {
        let positions = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let normals = [0.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let vertices = Vertex::interleave(&positions, &normals);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[1].position, [3.0, 4.0, 5.0]);
        assert_eq!(vertices[1].normal, [0.0, 1.0, 0.0]);
    }
}
