//! Pure-Rust two-level BVH.
//!
//! One bottom-level [`Bvh`] per geometry collection, in object space, and
//! one top-level [`Bvh`] over the world bounds of the instances. Rays are
//! moved into object space per instance without renormalizing the
//! direction, so `t` means the same thing at both levels.

use kestrel_math::{Aabb, Interval, Mat4, Mat4Ext, Vec3};

use super::{Hit, Intersector};
use crate::ray::Ray;
use crate::scene::{GeometryCollection, Instance};

/// Maximum items per leaf before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// Möller-Trumbore ray/triangle test.
///
/// Returns `(t, u, v)` where `u` and `v` weight `v1` and `v2`.
#[inline]
pub fn intersect_triangle(
    origin: Vec3,
    direction: Vec3,
    [v0, v1, v2]: [Vec3; 3],
    t_min: f32,
    t_max: f32,
) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = direction.cross(edge2);
    let a = edge1.dot(h);
    // parallel
    if a.abs() < 1e-10 {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if t < t_min || t >= t_max {
        return None;
    }
    Some((t, u, v))
}

enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        items: Vec<usize>,
        bbox: Aabb,
    },
    Empty,
}

impl BvhNode {
    /// Median split on the longest axis of the centroid bounds.
    fn build(mut items: Vec<usize>, bounds: &[Aabb]) -> Self {
        if items.is_empty() {
            return BvhNode::Empty;
        }

        let bbox = items
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &bounds[i]));

        if items.len() <= LEAF_MAX_SIZE {
            return BvhNode::Leaf { items, bbox };
        }

        let centroid_bounds = Aabb::from_point_set(items.iter().map(|&i| bounds[i].centroid()));
        let axis = centroid_bounds.longest_axis();

        items.sort_unstable_by(|&a, &b| {
            let ca = bounds[a].centroid()[axis];
            let cb = bounds[b].centroid()[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_items = items.split_off(items.len() / 2);
        BvhNode::Branch {
            left: Box::new(Self::build(items, bounds)),
            right: Box::new(Self::build(right_items, bounds)),
            bbox,
        }
    }

    fn bbox(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } | BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    fn closest<F>(&self, origin: Vec3, direction: Vec3, t_min: f32, t_max: &mut f32, hit_item: &mut F) -> bool
    where
        F: FnMut(usize, f32) -> Option<f32>,
    {
        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { items, bbox } => {
                if !bbox.hit(origin, direction, Interval::new(t_min, *t_max)) {
                    return false;
                }
                let mut hit_anything = false;
                for &item in items {
                    if let Some(t) = hit_item(item, *t_max) {
                        *t_max = t;
                        hit_anything = true;
                    }
                }
                hit_anything
            }
            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(origin, direction, Interval::new(t_min, *t_max)) {
                    return false;
                }
                // right is clipped by whatever left found
                let hit_left = left.closest(origin, direction, t_min, t_max, hit_item);
                let hit_right = right.closest(origin, direction, t_min, t_max, hit_item);
                hit_left || hit_right
            }
        }
    }

    fn any<F>(&self, origin: Vec3, direction: Vec3, ray_t: Interval, hit_item: &mut F) -> bool
    where
        F: FnMut(usize) -> bool,
    {
        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { items, bbox } => {
                bbox.hit(origin, direction, ray_t) && items.iter().any(|&item| hit_item(item))
            }
            BvhNode::Branch { left, right, bbox } => {
                bbox.hit(origin, direction, ray_t)
                    && (left.any(origin, direction, ray_t, hit_item) || right.any(origin, direction, ray_t, hit_item))
            }
        }
    }
}

/// Binary BVH over items identified by index.
///
/// The tree only knows item bounds. Callers supply the exact test as a
/// closure, which lets the same tree type serve triangles and instances.
pub struct Bvh {
    root: BvhNode,
    len: usize,
}

impl Bvh {
    /// Build over `bounds[i]` for every item `i`.
    pub fn new(bounds: &[Aabb]) -> Self {
        Self {
            root: BvhNode::build((0..bounds.len()).collect(), bounds),
            len: bounds.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn bounds(&self) -> Aabb {
        self.root.bbox()
    }

    /// Nearest-hit traversal.
    ///
    /// `hit_item(i, t_max)` returns the hit distance of item `i` when it is
    /// closer than `t_max`. On return `t_max` holds the nearest distance.
    pub fn closest<F>(&self, origin: Vec3, direction: Vec3, t_min: f32, t_max: &mut f32, mut hit_item: F) -> bool
    where
        F: FnMut(usize, f32) -> Option<f32>,
    {
        self.root.closest(origin, direction, t_min, t_max, &mut hit_item)
    }

    /// Any-hit traversal; stops at the first item for which `hit_item`
    /// returns true.
    pub fn any<F>(&self, origin: Vec3, direction: Vec3, ray_t: Interval, mut hit_item: F) -> bool
    where
        F: FnMut(usize) -> bool,
    {
        self.root.any(origin, direction, ray_t, &mut hit_item)
    }
}

/// A triangle of a collection, in object space.
struct PrimRef {
    geometry: u32,
    primitive: u32,
    vertices: [Vec3; 3],
}

/// Object-space triangles of one geometry collection.
struct Blas {
    prims: Vec<PrimRef>,
    bvh: Bvh,
}

impl Blas {
    fn new(collection: &GeometryCollection) -> Self {
        let mut prims = Vec::new();
        for (geometry, geom) in collection.geometries.iter().enumerate() {
            let mesh = &geom.mesh;
            for primitive in 0..mesh.triangle_count() {
                let [a, b, c] = mesh.triangle(primitive);
                prims.push(PrimRef {
                    geometry: geometry as u32,
                    primitive: primitive as u32,
                    vertices: [mesh.positions[a], mesh.positions[b], mesh.positions[c]],
                });
            }
        }

        let bounds: Vec<Aabb> = prims
            .iter()
            .map(|p| Aabb::from_point_set(p.vertices.iter().copied()))
            .collect();
        let bvh = Bvh::new(&bounds);
        Self { prims, bvh }
    }

    fn intersect(&self, origin: Vec3, direction: Vec3, t_min: f32, t_max: f32) -> Option<Hit> {
        let mut nearest = t_max;
        let mut found = None;
        self.bvh.closest(origin, direction, t_min, &mut nearest, |index, limit| {
            let prim = &self.prims[index];
            let (t, u, v) = intersect_triangle(origin, direction, prim.vertices, t_min, limit)?;
            found = Some(Hit {
                instance: 0,
                geometry: prim.geometry as usize,
                primitive: prim.primitive as usize,
                u,
                v,
                t,
            });
            Some(t)
        });
        found
    }

    fn occluded(&self, origin: Vec3, direction: Vec3, ray_t: Interval) -> bool {
        self.bvh.any(origin, direction, ray_t, |index| {
            intersect_triangle(origin, direction, self.prims[index].vertices, ray_t.min, ray_t.max).is_some()
        })
    }
}

struct TlasInstance {
    world_to_object: Mat4,
    blas: usize,
}

/// Two-level BVH intersector.
pub struct BvhIntersector {
    blases: Vec<Blas>,
    instances: Vec<TlasInstance>,
    tlas: Bvh,
}

impl BvhIntersector {
    pub fn new(collections: &[GeometryCollection], instances: &[Instance]) -> Self {
        let blases: Vec<Blas> = collections.iter().map(Blas::new).collect();

        let world_bounds: Vec<Aabb> = instances
            .iter()
            .map(|inst| inst.transform.transform_aabb(&blases[inst.collection].bvh.bounds()))
            .collect();
        let tlas = Bvh::new(&world_bounds);

        let instances: Vec<TlasInstance> = instances
            .iter()
            .map(|inst| TlasInstance {
                world_to_object: inst.transform.inverse(),
                blas: inst.collection,
            })
            .collect();

        log::debug!(
            "BVH built: {} collections, {} instances, {} triangles",
            blases.len(),
            instances.len(),
            blases.iter().map(|b| b.prims.len()).sum::<usize>()
        );

        Self { blases, instances, tlas }
    }
}

impl Intersector for BvhIntersector {
    fn intersect(&self, ray: &mut Ray) -> Option<Hit> {
        let (origin, direction, t_min) = (ray.origin, ray.direction, ray.t_min);
        let mut t_max = ray.t_max;
        let mut found = None;

        self.tlas.closest(origin, direction, t_min, &mut t_max, |index, limit| {
            let inst = &self.instances[index];
            let o = inst.world_to_object.transform_point3(origin);
            let d = inst.world_to_object.transform_vector3(direction);
            let hit = self.blases[inst.blas].intersect(o, d, t_min, limit)?;
            found = Some(Hit { instance: index, ..hit });
            Some(hit.t)
        });

        if found.is_some() {
            ray.t_max = t_max;
        }
        found
    }

    fn occluded(&self, ray: &Ray) -> bool {
        let ray_t = ray.interval();
        self.tlas.any(ray.origin, ray.direction, ray_t, |index| {
            let inst = &self.instances[index];
            let o = inst.world_to_object.transform_point3(ray.origin);
            let d = inst.world_to_object.transform_vector3(ray.direction);
            self.blases[inst.blas].occluded(o, d, ray_t)
        })
    }

    fn bounds(&self) -> Aabb {
        self.tlas.bounds()
    }
}
