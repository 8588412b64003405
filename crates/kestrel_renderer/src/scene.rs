//! Scene description and hit reconstruction.
//!
//! Geometry lives in collections that any number of instances can share.
//! Media are kept in an arena and referenced by [`MediumId`]. Everything is
//! read-only once [`SceneBuilder::build`] returns.

use kestrel_core::Mesh;
use kestrel_math::{Aabb, Frame, Mat3, Mat4, Vec2, Vec3};

use crate::accel::{Backend, Intersector};
use crate::bsdf::Bsdf;
use crate::error::{SceneError, SceneResult};
use crate::interaction::{Interaction, SurfaceInteraction};
use crate::light::Light;
use crate::medium::{Medium, MediumId, MediumInterface};
use crate::ray::Ray;

/// A mesh and the material bound to every hit on it.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub mesh: Mesh,
    /// `None` marks a medium boundary that rays pass straight through
    pub material: Option<Bsdf>,
}

impl Geometry {
    pub fn new(mesh: Mesh, material: Bsdf) -> Self {
        Self {
            mesh,
            material: Some(material),
        }
    }

    pub fn medium_boundary(mesh: Mesh) -> Self {
        Self { mesh, material: None }
    }
}

/// Geometry shared by one or more instances.
#[derive(Debug, Clone)]
pub struct GeometryCollection {
    pub name: String,
    pub geometries: Vec<Geometry>,
}

impl GeometryCollection {
    pub fn new(name: impl Into<String>, geometries: Vec<Geometry>) -> Self {
        Self {
            name: name.into(),
            geometries,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.geometries.iter().map(|g| g.mesh.triangle_count()).sum()
    }
}

/// A placement of a collection in the world.
#[derive(Debug, Clone)]
pub struct Instance {
    pub collection: usize,
    /// Object to world
    pub transform: Mat4,
    pub medium_interface: MediumInterface,
}

impl Instance {
    pub fn new(collection: usize, transform: Mat4) -> Self {
        Self {
            collection,
            transform,
            medium_interface: MediumInterface::vacuum(),
        }
    }

    pub fn with_medium_interface(mut self, medium_interface: MediumInterface) -> Self {
        self.medium_interface = medium_interface;
        self
    }
}

/// Collects scene parts and validates them into a [`Scene`].
#[derive(Default)]
pub struct SceneBuilder {
    collections: Vec<GeometryCollection>,
    instances: Vec<Instance>,
    lights: Vec<Box<dyn Light>>,
    media: Vec<Box<dyn Medium>>,
    backend: Backend,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index instances use to refer to the collection.
    pub fn add_collection(&mut self, collection: GeometryCollection) -> usize {
        self.collections.push(collection);
        self.collections.len() - 1
    }

    pub fn add_instance(&mut self, instance: Instance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    pub fn add_light(&mut self, light: impl Light + 'static) {
        self.lights.push(Box::new(light));
    }

    pub fn add_medium(&mut self, medium: impl Medium + 'static) -> MediumId {
        self.media.push(Box::new(medium));
        MediumId(self.media.len() - 1)
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn set_backend(&mut self, backend: Backend) {
        self.backend = backend;
    }

    fn validate(&self) -> SceneResult<()> {
        if self.instances.is_empty() {
            return Err(SceneError::EmptyScene);
        }

        for collection in &self.collections {
            for (index, geometry) in collection.geometries.iter().enumerate() {
                geometry
                    .mesh
                    .validate()
                    .map_err(|reason| SceneError::InvalidGeometry {
                        collection: collection.name.clone(),
                        geometry: index,
                        reason,
                    })?;
            }
        }

        let media_count = self.media.len();
        for (index, instance) in self.instances.iter().enumerate() {
            if instance.collection >= self.collections.len() {
                return Err(SceneError::InvalidInstance(index));
            }
            let mi = instance.medium_interface;
            for id in [mi.inside, mi.outside].into_iter().flatten() {
                if id.0 >= media_count {
                    return Err(SceneError::MissingMedium(id.0));
                }
            }
        }
        Ok(())
    }

    pub fn build(self) -> SceneResult<Scene> {
        self.validate()?;

        if self.lights.is_empty() {
            log::warn!("Scene has no lights; direct lighting will be black");
        }

        let accel = self.backend.build(&self.collections, &self.instances)?;
        let normal_matrices = self
            .instances
            .iter()
            .map(|inst| Mat3::from_mat4(inst.transform).inverse().transpose())
            .collect();

        let triangles: usize = self
            .instances
            .iter()
            .map(|inst| self.collections[inst.collection].triangle_count())
            .sum();
        log::info!(
            "Scene built: {} instances of {} collections, {} triangles, {} lights, {} media",
            self.instances.len(),
            self.collections.len(),
            triangles,
            self.lights.len(),
            self.media.len()
        );

        Ok(Scene {
            collections: self.collections,
            instances: self.instances,
            normal_matrices,
            lights: self.lights,
            media: self.media,
            accel,
        })
    }
}

/// A built, immutable scene.
pub struct Scene {
    collections: Vec<GeometryCollection>,
    instances: Vec<Instance>,
    normal_matrices: Vec<Mat3>,
    lights: Vec<Box<dyn Light>>,
    media: Vec<Box<dyn Medium>>,
    accel: Box<dyn Intersector>,
}

impl Scene {
    pub fn lights(&self) -> &[Box<dyn Light>] {
        &self.lights
    }

    pub fn medium(&self, id: MediumId) -> Option<&dyn Medium> {
        self.media.get(id.0).map(|m| m.as_ref())
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn collections(&self) -> &[GeometryCollection] {
        &self.collections
    }

    pub fn bounds(&self) -> Aabb {
        self.accel.bounds()
    }

    pub fn occluded(&self, ray: &Ray) -> bool {
        self.accel.occluded(ray)
    }

    /// Nearest surface along `ray`, with its material bound to the hit.
    /// Narrows `ray.t_max` to the hit.
    pub fn intersect(&self, ray: &mut Ray) -> Option<SurfaceInteraction> {
        let hit = self.accel.intersect(ray)?;

        let instance = &self.instances[hit.instance];
        let geometry = &self.collections[instance.collection].geometries[hit.geometry];
        let mesh = &geometry.mesh;
        let [i0, i1, i2] = mesh.triangle(hit.primitive);
        let xf = &instance.transform;

        let p0 = xf.transform_point3(mesh.positions[i0]);
        let p1 = xf.transform_point3(mesh.positions[i1]);
        let p2 = xf.transform_point3(mesh.positions[i2]);
        let b = Vec3::new(1.0 - hit.u - hit.v, hit.u, hit.v);
        let p = p0 * b.x + p1 * b.y + p2 * b.z;

        let wo = -ray.direction.normalize();
        let mut ng = (p1 - p0).cross(p2 - p0).try_normalize().unwrap_or(wo);

        let ns = mesh.normals.as_ref().and_then(|normals| {
            let normal_matrix = &self.normal_matrices[hit.instance];
            let n = normal_matrix.mul_vec3(normals[i0]) * b.x
                + normal_matrix.mul_vec3(normals[i1]) * b.y
                + normal_matrix.mul_vec3(normals[i2]) * b.z;
            n.try_normalize()
        });
        // keep the geometric normal on the side the mesh normals point to
        if let Some(ns) = ns {
            if ng.dot(ns) < 0.0 {
                ng = -ng;
            }
        }

        let uv = match &mesh.uvs {
            Some(uvs) => uvs[i0] * b.x + uvs[i1] * b.y + uvs[i2] * b.z,
            None => Vec2::new(hit.u, hit.v),
        };

        let medium_interface = if instance.medium_interface.is_transition() {
            instance.medium_interface
        } else {
            MediumInterface::uniform(ray.medium)
        };

        let geometry_frame = Frame::from_normal(ng);
        let shading_frame = ns.map_or(geometry_frame, Frame::from_normal);
        let bsdf = geometry.material.as_ref().map(|m| m.bind(ng, shading_frame));

        Some(SurfaceInteraction {
            interaction: Interaction::new(p, wo, ng, ray.time, medium_interface),
            uv,
            geometry_frame,
            shading_frame,
            bsdf,
            instance: hit.instance,
            geometry: hit.geometry,
            primitive: hit.primitive,
            t: hit.t,
        })
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("collections", &self.collections.len())
            .field("instances", &self.instances.len())
            .field("lights", &self.lights.len())
            .field("media", &self.media.len())
            .finish()
    }
}
