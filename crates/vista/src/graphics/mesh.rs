use crate::nodes::params::{Cube, Geometry, MeshData, Sphere};
use ahash::AHashMap;
use glam::{vec3, Mat4, Vec3};
use ordered_float::OrderedFloat;
use std::{
    f32::consts::{PI, TAU},
    sync::{Arc, Weak},
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    Empty,
    #[error("flat {0} array has a length of {1}, which isn't a multiple of 3")]
    NotXyz(&'static str, usize),
    #[error("mesh has {normals} normals for {positions} positions")]
    NormalCountMismatch { positions: usize, normals: usize },
    #[error("index count {0} isn't a multiple of 3")]
    NotTriangles(usize),
    #[error("index {index} is out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
    #[error("invalid primitive: {0}")]
    InvalidPrimitive(&'static str),
}

/// Most slices (and rings) a generated sphere may have.
pub const MAX_SPHERE_TESSELLATION: u32 = 1024;

/// Sphere enclosing a mesh, used for picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Transforms the sphere into another space. Non-uniform scales grow the sphere along the
    /// largest scaled axis, so the result still encloses the transformed mesh.
    pub fn transformed(&self, matrix: &Mat4) -> BoundingSphere {
        let scale = [matrix.x_axis, matrix.y_axis, matrix.z_axis]
            .into_iter()
            .map(|axis| axis.truncate().length())
            .fold(0.0, f32::max);

        BoundingSphere {
            center: matrix.transform_point3(self.center),
            radius: self.radius * scale,
        }
    }
}

/// Triangle mesh, ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub bounds: BoundingSphere,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Generates a UV sphere centered at the origin.
    pub fn sphere(sphere: &Sphere) -> Result<Mesh, MeshError> {
        if !(sphere.radius > 0.0) {
            return Err(MeshError::InvalidPrimitive("sphere radius must be positive"));
        }
        if sphere.slices < 3 || sphere.rings < 2 {
            return Err(MeshError::InvalidPrimitive(
                "spheres need at least 3 slices and 2 rings",
            ));
        }

        if sphere.slices > MAX_SPHERE_TESSELLATION || sphere.rings > MAX_SPHERE_TESSELLATION {
            return Err(MeshError::InvalidPrimitive(
                "spheres can't have more than 1024 slices or rings",
            ));
        }

        let (slices, rings) = (sphere.slices, sphere.rings);
        let vertex_count = (slices as usize + 1) * (rings as usize + 1);
        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);

        for ring in 0..=rings {
            let theta = ring as f32 * PI / rings as f32;
            for slice in 0..=slices {
                let phi = slice as f32 * TAU / slices as f32;
                let normal = vec3(phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
                positions.push(normal * sphere.radius);
                normals.push(normal);
            }
        }

        let mut indices = Vec::with_capacity(slices as usize * rings as usize * 6);
        for ring in 0..rings {
            for slice in 0..slices {
                let first = ring * (slices + 1) + slice;
                let second = first + slices + 1;
                indices.extend([first, second, first + 1, second, second + 1, first + 1]);
            }
        }

        Ok(Mesh {
            positions,
            normals,
            indices,
            bounds: BoundingSphere {
                center: Vec3::ZERO,
                radius: sphere.radius,
            },
        })
    }

    /// Generates an axis aligned box centered at the origin, with flat shaded faces.
    pub fn cube(cube: &Cube) -> Result<Mesh, MeshError> {
        let extents = vec3(cube.x, cube.y, cube.z);
        if !(extents.min_element() > 0.0) {
            return Err(MeshError::InvalidPrimitive("cube extents must be positive"));
        }

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for normal in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
            // Two axes spanning the face, ordered so that triangles wind counter-clockwise
            let u = normal.any_orthonormal_vector();
            let v = normal.cross(u);

            let base = positions.len() as u32;
            for (a, b) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((normal + u * a + v * b) * extents);
                normals.push(normal);
            }
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Ok(Mesh {
            positions,
            normals,
            indices,
            bounds: BoundingSphere {
                center: Vec3::ZERO,
                radius: extents.length(),
            },
        })
    }

    /// Builds a mesh from raw data. Missing normals are computed from the triangles.
    pub fn from_data(data: &MeshData) -> Result<Mesh, MeshError> {
        let positions = flat_to_vectors("positions", &data.positions)?;
        if positions.is_empty() {
            return Err(MeshError::Empty);
        }
        if data.indices.len() % 3 != 0 {
            return Err(MeshError::NotTriangles(data.indices.len()));
        }
        if let Some(&index) = data
            .indices
            .iter()
            .find(|&&index| index as usize >= positions.len())
        {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertices: positions.len(),
            });
        }

        let normals = if data.normals.is_empty() {
            compute_normals(&positions, &data.indices)
        } else {
            let normals = flat_to_vectors("normals", &data.normals)?;
            if normals.len() != positions.len() {
                return Err(MeshError::NormalCountMismatch {
                    positions: positions.len(),
                    normals: normals.len(),
                });
            }
            normals
        };

        let (min, max) = positions
            .iter()
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(min, max), &p| {
                (min.min(p), max.max(p))
            });
        let center = (min + max) * 0.5;
        let radius = positions
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0, f32::max);

        Ok(Mesh {
            positions,
            normals,
            indices: data.indices.clone(),
            bounds: BoundingSphere { center, radius },
        })
    }
}

fn flat_to_vectors(what: &'static str, flat: &[f32]) -> Result<Vec<Vec3>, MeshError> {
    if flat.len() % 3 != 0 {
        return Err(MeshError::NotXyz(what, flat.len()));
    }
    Ok(flat
        .chunks_exact(3)
        .map(|xyz| vec3(xyz[0], xyz[1], xyz[2]))
        .collect())
}

fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals.iter().map(|n| n.normalize_or_zero()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PrimitiveKey {
    Sphere(OrderedFloat<f32>, u32, u32),
    Cube([OrderedFloat<f32>; 3]),
}

/// Cache of generated meshes. Primitives with equal parameters share one mesh, raw meshes are
/// converted once per [`MeshData`] allocation.
#[derive(Default)]
pub struct GeometryCache {
    primitives: AHashMap<PrimitiveKey, Arc<Mesh>>,
    raw: AHashMap<usize, (Weak<MeshData>, Arc<Mesh>)>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mesh of a geometry node, generating it if needed.
    pub fn mesh(&mut self, geometry: &Geometry) -> Result<Arc<Mesh>, MeshError> {
        match geometry {
            Geometry::Sphere(sphere) => {
                let key = PrimitiveKey::Sphere(sphere.radius.into(), sphere.slices, sphere.rings);
                self.primitive(key, || Mesh::sphere(sphere))
            }
            Geometry::Cube(cube) => {
                let key = PrimitiveKey::Cube([cube.x.into(), cube.y.into(), cube.z.into()]);
                self.primitive(key, || Mesh::cube(cube))
            }
            Geometry::Mesh(data) => {
                let key = Arc::as_ptr(data) as usize;
                if let Some((weak, mesh)) = self.raw.get(&key) {
                    if weak.upgrade().is_some_and(|alive| Arc::ptr_eq(&alive, data)) {
                        return Ok(mesh.clone());
                    }
                }

                let mesh = Arc::new(Mesh::from_data(data)?);
                self.raw.insert(key, (Arc::downgrade(data), mesh.clone()));
                Ok(mesh)
            }
        }
    }

    fn primitive(
        &mut self,
        key: PrimitiveKey,
        generate: impl FnOnce() -> Result<Mesh, MeshError>,
    ) -> Result<Arc<Mesh>, MeshError> {
        if let Some(mesh) = self.primitives.get(&key) {
            return Ok(mesh.clone());
        }
        let mesh = Arc::new(generate()?);
        self.primitives.insert(key, mesh.clone());
        Ok(mesh)
    }

    /// Forgets meshes generated for raw mesh data that no longer exists.
    pub fn prune(&mut self) {
        self.raw.retain(|_, (weak, _)| weak.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.primitives.len() + self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_generation() {
        let mesh = Mesh::sphere(&Sphere {
            radius: 2.0,
            slices: 8,
            rings: 4,
        })
        .unwrap();

        assert_eq!(mesh.vertex_count(), 9 * 5);
        assert_eq!(mesh.triangle_count(), 8 * 4 * 2);
        assert!(mesh
            .positions
            .iter()
            .all(|p| (p.length() - 2.0).abs() < 1e-5));
        assert_eq!(mesh.bounds.radius, 2.0);

        assert!(Mesh::sphere(&Sphere {
            slices: 2,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn sphere_tessellation_is_bounded() {
        let finest = Mesh::sphere(&Sphere {
            radius: 1.0,
            slices: MAX_SPHERE_TESSELLATION,
            rings: 3,
        })
        .unwrap();
        assert_eq!(finest.vertex_count(), (MAX_SPHERE_TESSELLATION as usize + 1) * 4);

        for (slices, rings) in [(70000, 70000), (MAX_SPHERE_TESSELLATION + 1, 2), (3, u32::MAX)] {
            assert!(matches!(
                Mesh::sphere(&Sphere {
                    radius: 1.0,
                    slices,
                    rings,
                }),
                Err(MeshError::InvalidPrimitive(_))
            ));
        }
    }

    #[test]
    fn cube_faces_point_outwards() {
        let mesh = Mesh::cube(&Cube {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        })
        .unwrap();

        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        for triangle in mesh.indices.chunks_exact(3) {
            let [a, b, c] =
                [triangle[0], triangle[1], triangle[2]].map(|i| mesh.positions[i as usize]);
            let winding = (b - a).cross(c - a).normalize();
            assert!(winding.abs_diff_eq(mesh.normals[triangle[0] as usize], 1e-5));
        }
        assert!(mesh
            .positions
            .iter()
            .all(|p| p.abs().abs_diff_eq(vec3(1.0, 2.0, 3.0), 1e-5)));
    }

    #[test]
    fn raw_mesh_validation() {
        let triangle = MeshData {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![],
            indices: vec![0, 1, 2],
        };
        let mesh = Mesh::from_data(&triangle).unwrap();
        assert!(mesh.normals.iter().all(|n| n.abs_diff_eq(Vec3::Z, 1e-6)));
        assert_eq!(mesh.bounds.center, vec3(0.5, 0.5, 0.0));

        let out_of_range = MeshData {
            indices: vec![0, 1, 3],
            ..triangle.clone()
        };
        assert_eq!(
            Mesh::from_data(&out_of_range),
            Err(MeshError::IndexOutOfRange {
                index: 3,
                vertices: 3
            })
        );

        let ragged = MeshData {
            positions: vec![0.0, 1.0],
            ..triangle
        };
        assert_eq!(Mesh::from_data(&ragged), Err(MeshError::NotXyz("positions", 2)));
        assert_eq!(Mesh::from_data(&MeshData::default()), Err(MeshError::Empty));
    }

    #[test]
    fn cache_shares_meshes() {
        let mut cache = GeometryCache::new();
        let a = cache.mesh(&Geometry::Sphere(Sphere::default())).unwrap();
        let b = cache.mesh(&Geometry::Sphere(Sphere::default())).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = cache
            .mesh(&Geometry::Sphere(Sphere {
                radius: 3.0,
                ..Default::default()
            }))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &c));

        let data = Arc::new(MeshData {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![],
            indices: vec![0, 1, 2],
        });
        let d = cache.mesh(&Geometry::Mesh(data.clone())).unwrap();
        let e = cache.mesh(&Geometry::Mesh(data.clone())).unwrap();
        assert!(Arc::ptr_eq(&d, &e));
        assert_eq!(cache.len(), 3);

        drop(data);
        cache.prune();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn bounds_follow_transforms() {
        let bounds = BoundingSphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let matrix =
            Mat4::from_translation(vec3(2.0, 0.0, -7.0)) * Mat4::from_scale(vec3(1.0, 3.0, 1.0));
        let moved = bounds.transformed(&matrix);
        assert_eq!(moved.center, vec3(2.0, 0.0, -7.0));
        assert!((moved.radius - 3.0).abs() < 1e-6);
    }
}
