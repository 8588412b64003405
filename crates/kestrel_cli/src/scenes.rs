//! Scene setup for the command line renderer.

use std::path::Path;

use anyhow::{Context, Result};
use kestrel_core::{load_obj, Mesh, Transform};
use kestrel_math::{Aabb, Mat4, Vec3};
use kestrel_renderer::bxdf::{Disney, Mirror, SpecularDielectric};
use kestrel_renderer::{
    Backend, Bsdf, Camera, Geometry, GeometryCollection, HomogeneousMedium, Instance, PointLight, Scene,
    SceneBuilder, Spectrum,
};

fn spectrum(r: f32, g: f32, b: f32) -> Spectrum {
    Spectrum::from_rgb(Vec3::new(r, g, b))
}

fn add_ground(builder: &mut SceneBuilder, half_extent: f32) {
    let ground = builder.add_collection(GeometryCollection::new(
        "ground",
        vec![Geometry::new(
            Mesh::quad(half_extent),
            Bsdf::new(Disney::diffuse(spectrum(0.5, 0.5, 0.5))),
        )],
    ));
    builder.add_instance(Instance::new(ground, Mat4::IDENTITY));
}

/// Three spheres on a ground plane under two point lights, optionally
/// filled with fog.
pub fn demo_scene(fog: Option<f32>, backend: Backend) -> Result<(Scene, Camera)> {
    let mut builder = SceneBuilder::new().with_backend(backend);
    add_ground(&mut builder, 20.0);

    let sphere = Mesh::uv_sphere(1.0, 64, 32);
    let balls = builder.add_collection(GeometryCollection::new(
        "balls",
        vec![Geometry::new(
            sphere.clone(),
            Bsdf::new(Disney::plastic(spectrum(0.7, 0.15, 0.1), 0.35).with_clearcoat(0.5, 0.9)),
        )],
    ));
    let mirror = builder.add_collection(GeometryCollection::new(
        "mirror",
        vec![Geometry::new(sphere.clone(), Bsdf::new(Mirror::new(Spectrum::splat(0.9))))],
    ));
    let glass = builder.add_collection(GeometryCollection::new(
        "glass",
        vec![Geometry::new(
            sphere,
            Bsdf::new(SpecularDielectric::new(Spectrum::ONE, Spectrum::ONE, 1.0, 1.5)),
        )],
    ));

    builder.add_instance(Instance::new(balls, Mat4::from_translation(Vec3::new(-2.2, 1.0, 0.0))));
    builder.add_instance(Instance::new(mirror, Mat4::from_translation(Vec3::new(0.0, 1.0, -0.5))));
    builder.add_instance(Instance::new(glass, Mat4::from_translation(Vec3::new(2.2, 1.0, 0.0))));

    builder.add_light(PointLight::new(Vec3::new(-3.0, 6.0, 4.0), Spectrum::splat(60.0)));
    builder.add_light(PointLight::new(Vec3::new(4.0, 4.0, -2.0), spectrum(20.0, 18.0, 14.0)));

    let mut camera = Camera::new()
        .with_position(Vec3::new(0.0, 2.5, 8.0), Vec3::new(0.0, 0.8, 0.0), Vec3::Y)
        .with_fov(35.0);

    if let Some(density) = fog {
        let id = builder.add_medium(HomogeneousMedium::new(
            Spectrum::splat(0.2 * density),
            Spectrum::splat(0.8 * density),
            0.3,
        ));
        camera = camera.with_medium(Some(id));
        log::info!("Demo scene fog density {}", density);
    }

    let scene = builder.build().context("failed to build demo scene")?;
    Ok((scene, camera))
}

/// An OBJ asset standing on a ground plane, framed by the camera and lit
/// by a key and a fill light.
pub fn obj_scene(path: &Path, backend: Backend) -> Result<(Scene, Camera)> {
    let asset = load_obj(path).with_context(|| format!("failed to load {}", path.display()))?;
    log::info!(
        "{}: {} submeshes, {} triangles",
        path.display(),
        asset.submeshes.len(),
        asset.triangle_count()
    );

    let bounds = asset
        .submeshes
        .iter()
        .fold(Aabb::EMPTY, |acc, sub| Aabb::surrounding(&acc, &sub.mesh.bounds));
    let extent = (bounds.max() - bounds.min()).max_element().max(1e-3);
    let scale = 2.0 / extent;
    let center = bounds.centroid();
    // unit-ish size, centred over the origin, resting on y = 0
    let to_world = Transform::from_scale_translation(
        scale,
        Vec3::new(-center.x, -bounds.min().y, -center.z) * scale,
    )
    .to_matrix();

    let geometries = asset
        .submeshes
        .iter()
        .map(|sub| Geometry::new(sub.mesh.clone(), Bsdf::from_material(&asset.material_for(sub))))
        .collect();

    let mut builder = SceneBuilder::new().with_backend(backend);
    add_ground(&mut builder, 20.0);
    let model = builder.add_collection(GeometryCollection::new(path.display().to_string(), geometries));
    builder.add_instance(Instance::new(model, to_world));

    let height = (bounds.max().y - bounds.min().y) * scale;
    builder.add_light(PointLight::new(Vec3::new(-3.0, height + 4.0, 4.0), Spectrum::splat(50.0)));
    builder.add_light(PointLight::new(Vec3::new(3.0, height + 2.0, 3.0), Spectrum::splat(15.0)));

    let target = Vec3::new(0.0, height * 0.5, 0.0);
    let camera = Camera::new()
        .with_position(target + Vec3::new(0.0, 1.0, 5.0), target, Vec3::Y)
        .with_fov(40.0);

    let scene = builder
        .build()
        .with_context(|| format!("failed to build scene for {}", path.display()))?;
    Ok((scene, camera))
}
