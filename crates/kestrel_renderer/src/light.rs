//! Emitters and deferred shadow queries.

use std::fmt::Debug;

use bitflags::bitflags;
use kestrel_math::{Mat4, Vec2, Vec3};

use crate::interaction::Interaction;
use crate::ray::Ray;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::Spectrum;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LightFlags: u8 {
        const DELTA_POSITION = 1 << 0;
        const DELTA_DIRECTION = 1 << 1;
        const AREA = 1 << 2;
        const INFINITE = 1 << 3;
    }
}

/// Shadow query between two vertices, resolved only when the sample turns
/// out to matter.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityTester {
    pub p0: Interaction,
    pub p1: Interaction,
}

impl VisibilityTester {
    pub fn new(p0: Interaction, p1: Interaction) -> Self {
        Self { p0, p1 }
    }

    /// Binary shadow test that ignores media.
    ///
    /// Medium boundaries do not block the segment; only surfaces with a
    /// material do. The any-hit query settles the common unoccluded case.
    pub fn unoccluded(&self, scene: &Scene) -> bool {
        let mut ray = self.p0.spawn_ray_to(&self.p1);
        if !scene.occluded(&ray) {
            return true;
        }

        loop {
            match scene.intersect(&mut ray) {
                None => return true,
                Some(si) if si.bsdf.is_some() => return false,
                Some(si) => ray = si.interaction.spawn_ray_to(&self.p1),
            }
        }
    }

    /// Transmittance from `p0` to `p1`.
    ///
    /// Walks the segment hit by hit. Medium boundaries are crossed while
    /// the transmittance of each medium span is accumulated; any surface
    /// with a material blocks the segment completely.
    pub fn tr(&self, scene: &Scene, sampler: &mut dyn Sampler) -> Spectrum {
        let mut ray = self.p0.spawn_ray_to(&self.p1);
        let mut tr = Spectrum::ONE;

        loop {
            let hit = scene.intersect(&mut ray);
            if let Some(si) = &hit {
                if si.bsdf.is_some() {
                    return Spectrum::ZERO;
                }
            }

            if let Some(medium) = ray.medium.and_then(|id| scene.medium(id)) {
                tr *= medium.tr(&ray, sampler);
            }

            match hit {
                Some(si) => ray = si.interaction.spawn_ray_to(&self.p1),
                None => break,
            }
        }
        tr
    }
}

/// Result of sampling incident illumination at a reference point.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    /// Incident radiance, before occlusion
    pub li: Spectrum,
    /// Unit direction from the reference point towards the light
    pub wi: Vec3,
    pub pdf: f32,
    pub vis: VisibilityTester,
}

/// An emitter.
pub trait Light: Send + Sync + Debug {
    fn flags(&self) -> LightFlags;

    /// Importance-sample a direction towards the light from `reference`.
    fn sample_li(&self, reference: &Interaction, u: Vec2) -> LightSample;

    /// Total emitted power.
    fn power(&self) -> Spectrum;

    /// Radiance carried by a ray that escaped the scene.
    fn le(&self, _ray: &Ray) -> Spectrum {
        Spectrum::ZERO
    }

    fn is_delta(&self) -> bool {
        self.flags()
            .intersects(LightFlags::DELTA_POSITION | LightFlags::DELTA_DIRECTION)
    }
}

/// Isotropic point emitter.
#[derive(Debug, Clone)]
pub struct PointLight {
    light_to_world: Mat4,
    position: Vec3,
    intensity: Spectrum,
}

impl PointLight {
    pub fn new(position: Vec3, intensity: Spectrum) -> Self {
        Self::from_transform(Mat4::from_translation(position), intensity)
    }

    /// The light sits at the origin of `light_to_world`.
    pub fn from_transform(light_to_world: Mat4, intensity: Spectrum) -> Self {
        Self {
            light_to_world,
            position: light_to_world.transform_point3(Vec3::ZERO),
            intensity,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn intensity(&self) -> Spectrum {
        self.intensity
    }

    pub fn transform(&self) -> &Mat4 {
        &self.light_to_world
    }
}

impl Light for PointLight {
    fn flags(&self) -> LightFlags {
        LightFlags::DELTA_POSITION
    }

    fn sample_li(&self, reference: &Interaction, _u: Vec2) -> LightSample {
        let to_light = self.position - reference.p;
        let dist2 = to_light.length_squared();
        let vis = VisibilityTester::new(*reference, Interaction::from_point(self.position, reference.time));
        if dist2 == 0.0 {
            return LightSample {
                li: Spectrum::ZERO,
                wi: Vec3::ZERO,
                pdf: 0.0,
                vis,
            };
        }

        LightSample {
            li: self.intensity / dist2,
            wi: to_light / dist2.sqrt(),
            pdf: 1.0,
            vis,
        }
    }

    fn power(&self) -> Spectrum {
        self.intensity * (4.0 * std::f32::consts::PI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::Bsdf;
    use crate::bxdf::LambertianReflection;
    use crate::medium::{HomogeneousMedium, MediumId, MediumInterface};
    use crate::sampler::RandomSampler;
    use crate::scene::{Geometry, GeometryCollection, Instance, SceneBuilder};
    use kestrel_core::Mesh;

    const SIGMA_A: f32 = 0.3;
    const SIGMA_S: f32 = 0.2;

    /// Fog filling the slab 1 < y < 3, bounded by two open quads whose
    /// normals point out of the slab.
    fn fog_slab(builder: &mut SceneBuilder) -> MediumId {
        let fog = builder.add_medium(HomogeneousMedium::new(
            Spectrum::splat(SIGMA_A),
            Spectrum::splat(SIGMA_S),
            0.0,
        ));
        let boundary = builder.add_collection(GeometryCollection::new(
            "slab",
            vec![Geometry::medium_boundary(Mesh::quad(4.0))],
        ));
        let interface = MediumInterface::new(Some(fog), None);
        let bottom = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)) * Mat4::from_rotation_x(std::f32::consts::PI);
        let top = Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0));
        builder.add_instance(Instance::new(boundary, bottom).with_medium_interface(interface));
        builder.add_instance(Instance::new(boundary, top).with_medium_interface(interface));
        fog
    }

    fn slab_tester() -> VisibilityTester {
        VisibilityTester::new(
            Interaction::from_point(Vec3::new(0.25, 0.0, -0.5), 0.0),
            Interaction::from_point(Vec3::new(0.25, 5.0, -0.5), 0.0),
        )
    }

    #[test]
    fn test_point_light_inverse_square() {
        let light = PointLight::new(Vec3::new(0.0, 2.0, 0.0), Spectrum::splat(8.0));
        let reference = Interaction::new(Vec3::ZERO, Vec3::Y, Vec3::Y, 0.0, MediumInterface::vacuum());

        let s = light.sample_li(&reference, Vec2::ZERO);
        assert_eq!(s.pdf, 1.0);
        assert!((s.wi - Vec3::Y).length() < 1e-6);
        assert!((s.li[0] - 2.0).abs() < 1e-6, "li = {}", s.li[0]);
        assert_eq!(s.vis.p1.p, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_point_light_is_delta() {
        let light = PointLight::new(Vec3::ZERO, Spectrum::ONE);
        assert!(light.is_delta());
        assert!(light.le(&Ray::default()).is_black());
        assert!((light.power()[0] - 4.0 * std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn test_point_light_from_transform() {
        let xf = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::from_rotation_y(0.5);
        let light = PointLight::from_transform(xf, Spectrum::ONE);
        assert!((light.position() - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn test_coincident_reference_has_zero_pdf() {
        let light = PointLight::new(Vec3::ONE, Spectrum::ONE);
        let s = light.sample_li(&Interaction::from_point(Vec3::ONE, 0.0), Vec2::ZERO);
        assert_eq!(s.pdf, 0.0);
        assert!(s.li.is_black());
    }

    #[test]
    fn test_medium_boundaries_do_not_block_shadow_rays() {
        let mut builder = SceneBuilder::new();
        fog_slab(&mut builder);
        let scene = builder.build().unwrap();

        assert!(slab_tester().unoccluded(&scene));
    }

    #[test]
    fn test_opaque_surface_blocks_shadow_rays() {
        let mut builder = SceneBuilder::new();
        fog_slab(&mut builder);
        let wall = builder.add_collection(GeometryCollection::new(
            "wall",
            vec![Geometry::new(
                Mesh::quad(4.0),
                Bsdf::new(LambertianReflection::new(Spectrum::ONE)),
            )],
        ));
        builder.add_instance(Instance::new(wall, Mat4::from_translation(Vec3::new(0.0, 4.0, 0.0))));
        let scene = builder.build().unwrap();

        let vis = slab_tester();
        let mut sampler = RandomSampler::new(1, 0);
        assert!(!vis.unoccluded(&scene));
        assert!(vis.tr(&scene, &mut sampler).is_black());
    }

    #[test]
    fn test_tr_across_medium_transition() {
        let mut builder = SceneBuilder::new();
        fog_slab(&mut builder);
        let scene = builder.build().unwrap();

        let mut sampler = RandomSampler::new(1, 0);
        let tr = slab_tester().tr(&scene, &mut sampler);

        // only the two units inside the slab attenuate
        let expected = (-(SIGMA_A + SIGMA_S) * 2.0).exp();
        for c in 0..crate::spectrum::SPECTRUM_SAMPLES {
            assert!(
                (tr[c] - expected).abs() < 1e-3,
                "channel {}: Tr = {}, expected {}",
                c,
                tr[c],
                expected
            );
        }
    }
}
