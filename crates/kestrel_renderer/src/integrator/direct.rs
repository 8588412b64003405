//! Next-event estimation towards the scene's lights.

use kestrel_math::{Vec2, Vec3};

use crate::bxdf::BxDFType;
use crate::interaction::{Interaction, MediumInteraction, SurfaceInteraction};
use crate::light::Light;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::Spectrum;

/// A path vertex light can be gathered at.
#[derive(Debug, Clone, Copy)]
pub enum ScatteringPoint<'a> {
    Surface(&'a SurfaceInteraction),
    Medium(&'a MediumInteraction),
}

impl<'a> ScatteringPoint<'a> {
    pub fn interaction(&self) -> &'a Interaction {
        match *self {
            ScatteringPoint::Surface(si) => &si.interaction,
            ScatteringPoint::Medium(mi) => &mi.interaction,
        }
    }

    /// Scattering towards `wi`, including the cosine term on surfaces.
    fn scattering(&self, wi: Vec3) -> Spectrum {
        match self {
            ScatteringPoint::Surface(si) => match &si.bsdf {
                Some(bsdf) => bsdf.f(si.wo(), wi, BxDFType::ALL) * wi.dot(si.shading_frame.n).abs(),
                None => Spectrum::ZERO,
            },
            ScatteringPoint::Medium(mi) => Spectrum::splat(mi.phase.p(mi.wo(), wi)),
        }
    }
}

/// Single-sample estimate of the light arriving from `light`.
///
/// With `handle_media` the shadow segment is attenuated by the media it
/// crosses, otherwise it is a binary visibility test.
pub fn estimate_direct(
    point: ScatteringPoint<'_>,
    u_light: Vec2,
    light: &dyn Light,
    scene: &Scene,
    sampler: &mut dyn Sampler,
    handle_media: bool,
) -> Spectrum {
    let ls = light.sample_li(point.interaction(), u_light);
    if ls.pdf <= 0.0 || ls.li.is_black() {
        return Spectrum::ZERO;
    }

    let f = point.scattering(ls.wi);
    if f.is_black() {
        return Spectrum::ZERO;
    }

    let li = if handle_media {
        ls.li * ls.vis.tr(scene, sampler)
    } else if ls.vis.unoccluded(scene) {
        ls.li
    } else {
        Spectrum::ZERO
    };
    if li.is_black() {
        return Spectrum::ZERO;
    }

    f * li / ls.pdf
}

/// Direct lighting from one uniformly chosen light, divided by the
/// selection probability.
pub fn uniform_sample_one_light(
    point: ScatteringPoint<'_>,
    scene: &Scene,
    sampler: &mut dyn Sampler,
    handle_media: bool,
) -> Spectrum {
    let lights = scene.lights();
    let n_lights = lights.len();
    if n_lights == 0 {
        return Spectrum::ZERO;
    }

    let index = ((sampler.get_1d() * n_lights as f32) as usize).min(n_lights - 1);
    let u_light = sampler.get_2d();
    let light = lights[index].as_ref();

    estimate_direct(point, u_light, light, scene, sampler, handle_media) * n_lights as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::fixtures::{add_ceiling, down_ray, floor_builder, lambertian, ALBEDO, HIT};
    use crate::light::PointLight;
    use crate::medium::HenyeyGreenstein;
    use crate::sampler::FixedSampler;
    use crate::sampling::{INV_4PI, INV_PI};

    fn floor_hit(scene: &Scene) -> SurfaceInteraction {
        scene.intersect(&mut down_ray(2.0)).unwrap()
    }

    #[test]
    fn test_lambertian_under_point_light() {
        let mut builder = floor_builder(lambertian(ALBEDO));
        builder.add_light(PointLight::new(HIT + Vec3::Y, Spectrum::ONE));
        let scene = builder.build().unwrap();
        let si = floor_hit(&scene);

        let mut sampler = FixedSampler::new(1, 0.0);
        let l = uniform_sample_one_light(ScatteringPoint::Surface(&si), &scene, &mut sampler, false);

        // albedo / pi * I / d^2 * cos(0)
        let expected = ALBEDO * INV_PI;
        assert!((l[0] - expected).abs() < 1e-4, "L = {}, expected {}", l[0], expected);
    }

    #[test]
    fn test_inverse_square_and_cosine() {
        let mut builder = floor_builder(lambertian(ALBEDO));
        builder.add_light(PointLight::new(HIT + Vec3::new(1.0, 1.0, 0.0), Spectrum::splat(2.0)));
        let scene = builder.build().unwrap();
        let si = floor_hit(&scene);

        let mut sampler = FixedSampler::new(1, 0.0);
        let l = uniform_sample_one_light(ScatteringPoint::Surface(&si), &scene, &mut sampler, true);

        let d2 = 2.0;
        let cos = 1.0 / 2.0f32.sqrt();
        let expected = ALBEDO * INV_PI * 2.0 / d2 * cos;
        assert!((l[0] - expected).abs() < 1e-4, "L = {}, expected {}", l[0], expected);
    }

    #[test]
    fn test_light_selection_is_reweighted() {
        // two coincident lights: either choice must account for both
        let mut builder = floor_builder(lambertian(ALBEDO));
        builder.add_light(PointLight::new(HIT + Vec3::Y, Spectrum::ONE));
        builder.add_light(PointLight::new(HIT + Vec3::Y, Spectrum::ONE));
        let scene = builder.build().unwrap();
        let si = floor_hit(&scene);

        for u in [0.0, 0.75] {
            let mut sampler = FixedSampler::new(1, u);
            let l = uniform_sample_one_light(ScatteringPoint::Surface(&si), &scene, &mut sampler, false);
            let expected = 2.0 * ALBEDO * INV_PI;
            assert!((l[0] - expected).abs() < 1e-4, "u = {}: L = {}", u, l[0]);
        }
    }

    #[test]
    fn test_occluded_light_contributes_nothing() {
        let mut builder = floor_builder(lambertian(ALBEDO));
        add_ceiling(&mut builder, 0.5, lambertian(1.0));
        builder.add_light(PointLight::new(HIT + Vec3::Y, Spectrum::ONE));
        let scene = builder.build().unwrap();

        let si = scene.intersect(&mut down_ray(0.25)).unwrap();
        let mut sampler = FixedSampler::new(1, 0.0);

        for handle_media in [false, true] {
            let l = uniform_sample_one_light(ScatteringPoint::Surface(&si), &scene, &mut sampler, handle_media);
            assert!(l.is_black(), "handle_media = {}: L = {:?}", handle_media, l);
        }
    }

    #[test]
    fn test_light_behind_surface() {
        let mut builder = floor_builder(lambertian(ALBEDO));
        builder.add_light(PointLight::new(HIT - Vec3::Y, Spectrum::ONE));
        let scene = builder.build().unwrap();
        let si = floor_hit(&scene);

        let mut sampler = FixedSampler::new(1, 0.0);
        let l = uniform_sample_one_light(ScatteringPoint::Surface(&si), &scene, &mut sampler, false);
        assert!(l.is_black());
    }

    #[test]
    fn test_no_lights_is_black() {
        let scene = floor_builder(lambertian(ALBEDO)).build().unwrap();
        let si = floor_hit(&scene);
        let mut sampler = FixedSampler::new(1, 0.5);
        let l = uniform_sample_one_light(ScatteringPoint::Surface(&si), &scene, &mut sampler, false);
        assert!(l.is_black());
    }

    #[test]
    fn test_medium_vertex_uses_phase_function() {
        let mut builder = floor_builder(lambertian(ALBEDO));
        builder.add_light(PointLight::new(Vec3::new(0.0, 3.0, 0.0), Spectrum::ONE));
        let scene = builder.build().unwrap();

        let mi = MediumInteraction::new(
            Interaction::in_medium(Vec3::new(0.0, 2.0, 0.0), Vec3::X, 0.0, None),
            HenyeyGreenstein::new(0.0),
        );
        let mut sampler = FixedSampler::new(1, 0.0);
        let l = uniform_sample_one_light(ScatteringPoint::Medium(&mi), &scene, &mut sampler, true);

        // isotropic phase times I / d^2 with d = 1
        assert!((l[0] - INV_4PI).abs() < 1e-5, "L = {}", l[0]);
    }
}
