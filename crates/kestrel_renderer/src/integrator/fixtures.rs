//! Small scenes shared by the integrator tests.

use std::f32::consts::PI;

use kestrel_core::Mesh;
use kestrel_math::{Mat4, Vec3};

use crate::bsdf::Bsdf;
use crate::bxdf::LambertianReflection;
use crate::ray::Ray;
use crate::scene::{Geometry, GeometryCollection, Instance, SceneBuilder};
use crate::spectrum::Spectrum;

pub const ALBEDO: f32 = 0.5;
/// Floor point the test rays land on, off the quad's diagonal.
pub const HIT: Vec3 = Vec3::new(0.25, 0.0, -0.5);

pub fn lambertian(albedo: f32) -> Bsdf {
    Bsdf::new(LambertianReflection::new(Spectrum::splat(albedo)))
}

/// An 8x8 floor through the origin facing +Y.
pub fn floor_builder(material: Bsdf) -> SceneBuilder {
    let mut builder = SceneBuilder::new();
    let floor = builder.add_collection(GeometryCollection::new(
        "floor",
        vec![Geometry::new(Mesh::quad(1.0), material)],
    ));
    builder.add_instance(Instance::new(floor, Mat4::from_scale(Vec3::splat(4.0))));
    builder
}

/// An 8x8 quad at `height` facing down.
pub fn add_ceiling(builder: &mut SceneBuilder, height: f32, material: Bsdf) {
    let ceiling = builder.add_collection(GeometryCollection::new(
        "ceiling",
        vec![Geometry::new(Mesh::quad(1.0), material)],
    ));
    let transform = Mat4::from_translation(Vec3::new(0.0, height, 0.0))
        * Mat4::from_rotation_x(PI)
        * Mat4::from_scale(Vec3::splat(4.0));
    builder.add_instance(Instance::new(ceiling, transform));
}

/// Straight down onto [`HIT`] from `height`.
pub fn down_ray(height: f32) -> Ray {
    Ray::new(HIT + Vec3::Y * height, -Vec3::Y)
}
