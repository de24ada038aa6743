//! Indexed triangle meshes.

use glam::Vec3;

/// Corner order of a unit cube: x varies fastest, then y, then z.
const CUBE_CORNERS: [Vec3; 8] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(0.0, 1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
];

/// Two triangles per face.
const CUBE_TRIANGLES: [[u32; 3]; 12] = [
    [0, 1, 3],
    [2, 3, 0],
    [5, 7, 6],
    [5, 6, 4],
    [0, 4, 5],
    [0, 5, 1],
    [2, 3, 7],
    [2, 7, 6],
    [1, 5, 7],
    [1, 7, 3],
    [4, 0, 2],
    [4, 2, 6],
];

#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an axis-aligned box of `size` centred on `center`.
    pub fn add_cube(&mut self, center: Vec3, size: Vec3) {
        let first = self.vertices.len() as u32;
        let origin = center - 0.5 * size;
        self.vertices
            .extend(CUBE_CORNERS.iter().map(|&corner| (origin + corner * size).to_array()));
        self.indices.extend(
            CUBE_TRIANGLES
                .iter()
                .map(|t| [t[0] + first, t[1] + first, t[2] + first]),
        );
    }

    /// Bounds as `(min, max)`; `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.vertices.iter().map(|&v| Vec3::from(v));
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cube_is_centred() {
        let mut mesh = TriangleMesh::new();
        mesh.add_cube(Vec3::new(0.0, -1.5, 0.0), Vec3::new(10.0, 0.1, 10.0));
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 12);

        let (lo, hi) = mesh.bounds().unwrap();
        assert_relative_eq!(lo.x, -5.0);
        assert_relative_eq!(lo.y, -1.55, epsilon = 1e-6);
        assert_relative_eq!(hi.y, -1.45, epsilon = 1e-6);
        assert_relative_eq!(hi.z, 5.0);
    }

    #[test]
    fn second_cube_indices_are_offset() {
        let mut mesh = TriangleMesh::new();
        mesh.add_cube(Vec3::ZERO, Vec3::ONE);
        mesh.add_cube(Vec3::ZERO, Vec3::splat(2.0));
        assert_eq!(mesh.vertices.len(), 16);
        assert_eq!(mesh.indices[12], [8, 9, 11]);
        assert_eq!(mesh.indices[23], [12, 10, 14]);
        assert_eq!(mesh.vertices[15], [1.0, 1.0, 1.0]);
        assert!(mesh.indices.iter().flatten().all(|&i| i < 16));
    }

    #[test]
    fn every_edge_is_shared_by_two_triangles() {
        let mut mesh = TriangleMesh::new();
        mesh.add_cube(Vec3::ZERO, Vec3::ONE);
        let mut edges = std::collections::HashMap::new();
        for t in &mesh.indices {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        assert!(edges.values().all(|&count| count == 2));
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(TriangleMesh::new().bounds().is_none());
    }
}
