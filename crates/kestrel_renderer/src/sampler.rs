//! Per-pixel sample streams.
//!
//! A sampler is reseeded from the pixel coordinate on every
//! [`Sampler::start_pixel`], so the image does not depend on which worker
//! renders which tile. Workers clone the template sampler once per tile.

use std::sync::Arc;

use kestrel_math::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sobol::params::JoeKuoD6;
use sobol::Sobol;

/// A restartable, per-pixel stream of uniform samples in `[0, 1)`.
pub trait Sampler: Send {
    /// Reset the stream for pixel `(x, y)` and rewind to the first sample.
    fn start_pixel(&mut self, x: u32, y: u32);

    /// Advance to the next sample. Returns false once the pixel's budget
    /// is exhausted.
    fn start_next_sample(&mut self) -> bool;

    fn get_1d(&mut self) -> f32;

    fn get_2d(&mut self) -> Vec2;

    fn samples_per_pixel(&self) -> u32;
}

/// Independent uniform samples from a seeded `StdRng`.
#[derive(Clone, Debug)]
pub struct RandomSampler {
    samples_per_pixel: u32,
    seed: u64,
    index: u32,
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(samples_per_pixel: u32, seed: u64) -> Self {
        Self {
            samples_per_pixel: samples_per_pixel.max(1),
            seed,
            index: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Index of the current sample within the pixel.
    pub fn current_sample(&self) -> u32 {
        self.index
    }
}

impl Sampler for RandomSampler {
    fn start_pixel(&mut self, x: u32, y: u32) {
        let pixel = ((y as u64) << 32) | x as u64;
        self.rng = StdRng::seed_from_u64(self.seed ^ pixel);
        self.index = 0;
    }

    fn start_next_sample(&mut self) -> bool {
        self.index += 1;
        self.index < self.samples_per_pixel
    }

    #[inline]
    fn get_1d(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    #[inline]
    fn get_2d(&mut self) -> Vec2 {
        Vec2::new(self.rng.gen::<f32>(), self.rng.gen::<f32>())
    }

    fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }
}

/// Returns the same value for every draw. Useful for closed-form checks.
#[derive(Clone, Debug)]
pub struct FixedSampler {
    samples_per_pixel: u32,
    index: u32,
    value: f32,
}

impl FixedSampler {
    pub fn new(samples_per_pixel: u32, value: f32) -> Self {
        Self {
            samples_per_pixel: samples_per_pixel.max(1),
            index: 0,
            value,
        }
    }
}

impl Sampler for FixedSampler {
    fn start_pixel(&mut self, _x: u32, _y: u32) {
        self.index = 0;
    }

    fn start_next_sample(&mut self) -> bool {
        self.index += 1;
        self.index < self.samples_per_pixel
    }

    fn get_1d(&mut self) -> f32 {
        self.value
    }

    fn get_2d(&mut self) -> Vec2 {
        Vec2::splat(self.value)
    }

    fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }
}

/// Sobol' dimensions precomputed per sample. Draws past this fall back to
/// the pixel's random stream.
pub const SOBOL_DIMENSIONS: usize = 128;

#[inline]
fn mix32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^ (x >> 16)
}

/// Laine-Karras style hash. Every output bit depends only on the input
/// bits below it, so after bit reversal it acts as a nested scramble.
#[inline]
fn lk_hash(mut n: u32, seed: u32) -> u32 {
    n ^= n.wrapping_mul(0x3d20_adea);
    n = n.wrapping_add(seed);
    n = n.wrapping_mul((seed >> 16) | 1);
    n ^= n.wrapping_mul(0x0552_6c56);
    n ^= n.wrapping_mul(0x53a2_2864);
    n
}

/// Owen-scrambled fixed-point value mapped to `[0, 1)`.
#[inline]
fn owen_scramble(x: u32, seed: u32) -> f32 {
    let y = lk_hash(x.reverse_bits(), seed).reverse_bits();
    // top 24 bits so the result is exact in f32 and never rounds up to 1
    (y >> 8) as f32 * (1.0 / 16_777_216.0)
}

/// Unscrambled Sobol' points, `samples` rows of `dimensions` values.
#[derive(Debug)]
struct SobolTable {
    dimensions: usize,
    samples: usize,
    points: Vec<u32>,
}

impl SobolTable {
    fn new(dimensions: usize, samples: usize) -> Self {
        let sequence = Sobol::<u32>::new(dimensions, &JoeKuoD6::extended());
        let mut points = Vec::with_capacity(dimensions * samples);
        for row in sequence.take(samples) {
            points.extend_from_slice(&row);
        }
        let samples = points.len() / dimensions;
        log::debug!("Sobol table: {} samples x {} dimensions", samples, dimensions);
        Self {
            dimensions,
            samples,
            points,
        }
    }

    #[inline]
    fn get(&self, sample: usize, dimension: usize) -> Option<u32> {
        if sample < self.samples && dimension < self.dimensions {
            Some(self.points[sample * self.dimensions + dimension])
        } else {
            None
        }
    }
}

/// Low-discrepancy samples from the Sobol' sequence.
///
/// Every pixel walks the same first `samples_per_pixel` points, decorrelated
/// by a per-pixel Owen scramble keyed on `(seed, x, y)`. The point table is
/// shared between clones. Sample counts are rounded up to a power of two so
/// each pixel gets a complete stratification.
#[derive(Clone, Debug)]
pub struct SobolSampler {
    table: Arc<SobolTable>,
    samples_per_pixel: u32,
    seed: u64,
    scramble: u32,
    index: u32,
    dimension: usize,
    rng: StdRng,
}

impl SobolSampler {
    pub fn new(samples_per_pixel: u32, seed: u64) -> Self {
        let requested = samples_per_pixel.max(1);
        let samples_per_pixel = requested.next_power_of_two();
        if samples_per_pixel != requested {
            log::warn!(
                "Sobol sampler rounds {} samples per pixel up to {}",
                requested,
                samples_per_pixel
            );
        }

        Self {
            table: Arc::new(SobolTable::new(SOBOL_DIMENSIONS, samples_per_pixel as usize)),
            samples_per_pixel,
            seed,
            scramble: 0,
            index: 0,
            dimension: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Index of the current sample within the pixel.
    pub fn current_sample(&self) -> u32 {
        self.index
    }
}

impl Sampler for SobolSampler {
    fn start_pixel(&mut self, x: u32, y: u32) {
        let folded = (self.seed ^ (self.seed >> 32)) as u32;
        self.scramble = mix32(folded ^ mix32(x ^ mix32(y.wrapping_add(0x9e37_79b9))));
        let pixel = ((y as u64) << 32) | x as u64;
        self.rng = StdRng::seed_from_u64(!self.seed ^ pixel);
        self.index = 0;
        self.dimension = 0;
    }

    fn start_next_sample(&mut self) -> bool {
        self.index += 1;
        self.dimension = 0;
        self.index < self.samples_per_pixel
    }

    fn get_1d(&mut self) -> f32 {
        let dimension = self.dimension;
        self.dimension += 1;
        match self.table.get(self.index as usize, dimension) {
            Some(x) => owen_scramble(x, self.scramble ^ (dimension as u32).wrapping_mul(0x9e37_79b9)),
            None => self.rng.gen::<f32>(),
        }
    }

    fn get_2d(&mut self) -> Vec2 {
        let u = self.get_1d();
        let v = self.get_1d();
        Vec2::new(u, v)
    }

    fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }
}
