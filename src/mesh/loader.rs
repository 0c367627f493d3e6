//! .obj mesh loading
//!
//! Loads a single anatomy mesh from an OBJ file. Normals are taken from the
//! file when a full set is present; otherwise face normals are accumulated
//! per vertex and normalized. The file stem is the mesh's file id.

use std::path::Path;

use anyhow::{bail, Context};

use super::MeshData;

/// Loads one .obj file into CPU-side mesh data.
///
/// Multi-model files are merged into a single mesh; anatomy exports carry
/// one model per file in practice.
pub fn load_obj(path: &Path) -> anyhow::Result<MeshData> {
    let file_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("no file stem in {}", path.display()))?;

    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("parsing {}", path.display()))?;

    if models.is_empty() {
        bail!("{} contains no geometry", path.display());
    }

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for model in &models {
        let mesh = &model.mesh;
        let base = (positions.len() / 3) as u32;

        positions.extend_from_slice(&mesh.positions);
        if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len() {
            normals.extend_from_slice(&mesh.normals);
        } else {
            normals.extend(accumulate_normals(&mesh.positions, &mesh.indices));
        }
        indices.extend(mesh.indices.iter().map(|&i| base + i));
    }

    let (center, radius) = bounds(&positions);

    Ok(MeshData {
        file_id,
        positions,
        normals,
        indices,
        center,
        radius,
    })
}

/// Per-vertex normals accumulated from face normals, for files without a
/// usable normal set.
pub fn accumulate_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];

    for triangle in indices.chunks(3) {
        if triangle.len() < 3 {
            continue;
        }
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let v = |i: usize| [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];
        let (v0, v1, v2) = (v(i0), v(i1), v(i2));

        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let face = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];

        for &idx in &[i0, i1, i2] {
            normals[idx * 3] += face[0];
            normals[idx * 3 + 1] += face[1];
            normals[idx * 3 + 2] += face[2];
        }
    }

    for normal in normals.chunks_mut(3) {
        let length =
            (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if length > 0.0 {
            normal[0] /= length;
            normal[1] /= length;
            normal[2] /= length;
        }
    }

    normals
}

fn bounds(positions: &[f32]) -> ([f32; 3], f32) {
    if positions.is_empty() {
        return ([0.0; 3], 0.0);
    }

    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for vertex in positions.chunks(3) {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex[axis]);
            max[axis] = max[axis].max(vertex[axis]);
        }
    }

    let center = [
        (min[0] + max[0]) / 2.0,
        (min[1] + max[1]) / 2.0,
        (min[2] + max[2]) / 2.0,
    ];
    let radius = ((max[0] - center[0]).powi(2)
        + (max[1] - center[1]).powi(2)
        + (max[2] - center[2]).powi(2))
    .sqrt();

    (center, radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_obj_reads_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f_patch.obj");
        std::fs::write(&path, "v 0 0 0\nv 2 0 0\nv 0 2 0\nf 1 2 3\n").unwrap();

        let mesh = load_obj(&path).unwrap();
        assert_eq!(mesh.file_id, "f_patch");
        assert_eq!(mesh.positions.len(), 9);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        assert_eq!(mesh.center, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_load_obj_missing_file_fails() {
        assert!(load_obj(Path::new("/nonexistent/mesh.obj")).is_err());
    }

    #[test]
    fn test_accumulate_normals_flat_triangle() {
        let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = accumulate_normals(&positions, &[0, 1, 2]);
        for vertex_normal in normals.chunks(3) {
            assert!((vertex_normal[2] - 1.0).abs() < 1e-6);
        }
    }
}
