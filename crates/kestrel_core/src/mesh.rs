//! Triangle mesh representation.
//!
//! Meshes are populated by the OBJ loader or the procedural helpers below
//! and handed to the renderer, which keeps them in object space and reads
//! vertices back by index when reconstructing hit points.

use kestrel_math::{Aabb, Vec2, Vec3};
use std::f32::consts::PI;

/// An indexed triangle mesh with optional per-vertex normals and UVs.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals, one per vertex when present
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates, one per vertex when present
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle, CCW winding)
    pub indices: Vec<u32>,

    /// Object-space bounds
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::from_point_set(positions.iter().copied());
        Self {
            positions,
            normals,
            uvs: None,
            indices,
            bounds,
        }
    }

    /// Attach per-vertex UV coordinates.
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// A square in the XZ plane centered at the origin, facing +Y.
    pub fn quad(half_extent: f32) -> Self {
        let h = half_extent;
        let positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, 0.0, h),
            Vec3::new(-h, 0.0, h),
        ];
        let uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        Self::new(positions, vec![0, 3, 2, 0, 2, 1], Some(vec![Vec3::Y; 4])).with_uvs(uvs)
    }

    /// Latitude/longitude sphere centered at the origin with outward normals.
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let row = segments + 1;

        let mut positions = Vec::with_capacity((row * (rings + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());
        let mut uvs = Vec::with_capacity(positions.capacity());

        for i in 0..=rings {
            let theta = PI * i as f32 / rings as f32;
            for j in 0..=segments {
                let phi = 2.0 * PI * j as f32 / segments as f32;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                positions.push(n * radius);
                normals.push(n);
                uvs.push(Vec2::new(j as f32 / segments as f32, i as f32 / rings as f32));
            }
        }

        let mut indices = Vec::new();
        for i in 0..rings {
            for j in 0..segments {
                let a = i * row + j;
                let b = a + row;
                let c = b + 1;
                let d = a + 1;
                // the pole rows collapse one of the two triangles
                if i != 0 {
                    indices.extend_from_slice(&[a, d, b]);
                }
                if i != rings - 1 {
                    indices.extend_from_slice(&[d, c, b]);
                }
            }
        }

        Self::new(positions, indices, Some(normals)).with_uvs(uvs)
    }

    /// Compute smooth vertex normals by averaging area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let edge1 = self.positions[i1] - p0;
            let edge2 = self.positions[i2] - p0;
            let face_normal = edge1.cross(edge2);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Check index and attribute consistency.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            ));
        }
        let vertex_count = self.positions.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(format!(
                "index {} out of range for {} vertices",
                bad, vertex_count
            ));
        }
        if let Some(normals) = &self.normals {
            if normals.len() != vertex_count {
                return Err(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    vertex_count
                ));
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != vertex_count {
                return Err(format!("{} uvs for {} vertices", uvs.len(), vertex_count));
            }
        }
        Ok(())
    }

    /// The three vertex indices of triangle `primitive`.
    #[inline]
    pub fn triangle(&self, primitive: usize) -> [usize; 3] {
        let base = primitive * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}
