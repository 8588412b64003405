//! Fixed-width spectral coefficient vectors.
//!
//! All radiometric quantities flow through [`Spectrum`], which is either
//! three RGB channels or a set of wavelength samples depending on the
//! `sampled-spectrum` feature. Arithmetic is always component-wise.

use kestrel_math::Vec3;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};

/// Shortest sampled wavelength in nanometres.
pub const SAMPLED_LAMBDA_START: f32 = 400.0;
/// Longest sampled wavelength in nanometres.
pub const SAMPLED_LAMBDA_END: f32 = 700.0;

/// Component-wise coefficient vector with `N` channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientSpectrum<const N: usize> {
    pub c: [f32; N],
}

/// Three-channel linear RGB.
pub type RgbSpectrum = CoefficientSpectrum<3>;
/// Sixty uniformly spaced wavelength samples over 400-700 nm.
pub type SampledSpectrum = CoefficientSpectrum<60>;

#[cfg(not(feature = "sampled-spectrum"))]
pub type Spectrum = RgbSpectrum;
#[cfg(feature = "sampled-spectrum")]
pub type Spectrum = SampledSpectrum;

/// Number of channels in the active [`Spectrum`].
#[cfg(not(feature = "sampled-spectrum"))]
pub const SPECTRUM_SAMPLES: usize = 3;
#[cfg(feature = "sampled-spectrum")]
pub const SPECTRUM_SAMPLES: usize = 60;

impl<const N: usize> Default for CoefficientSpectrum<N> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const N: usize> CoefficientSpectrum<N> {
    pub const ZERO: Self = Self { c: [0.0; N] };
    pub const ONE: Self = Self { c: [1.0; N] };

    #[inline]
    pub const fn new(c: [f32; N]) -> Self {
        Self { c }
    }

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { c: [v; N] }
    }

    /// True when every channel is exactly zero.
    #[inline]
    pub fn is_black(&self) -> bool {
        self.c.iter().all(|&v| v == 0.0)
    }

    #[inline]
    pub fn max_component(&self) -> f32 {
        self.c.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    #[inline]
    pub fn average(&self) -> f32 {
        self.c.iter().sum::<f32>() / N as f32
    }

    pub fn has_nans(&self) -> bool {
        self.c.iter().any(|v| v.is_nan())
    }

    #[inline]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        let mut out = *self;
        for v in &mut out.c {
            *v = f(*v);
        }
        out
    }

    pub fn sqrt(&self) -> Self {
        self.map(f32::sqrt)
    }

    pub fn exp(&self) -> Self {
        self.map(f32::exp)
    }

    pub fn clamp(&self, lo: f32, hi: f32) -> Self {
        self.map(|v| v.clamp(lo, hi))
    }

    /// Linear interpolation `a + t(b - a)` per channel.
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        a * (1.0 - t) + b * t
    }

    /// Centre wavelength of channel `i` when the spectrum is sampled.
    fn lambda(i: usize) -> f32 {
        let step = (SAMPLED_LAMBDA_END - SAMPLED_LAMBDA_START) / N as f32;
        SAMPLED_LAMBDA_START + (i as f32 + 0.5) * step
    }

    /// Band index (0 = r, 1 = g, 2 = b) a sampled channel contributes to.
    fn band(i: usize) -> usize {
        let lambda = Self::lambda(i);
        if lambda < 500.0 {
            2
        } else if lambda < 600.0 {
            1
        } else {
            0
        }
    }

    /// Build from linear RGB. Sampled spectra use a piecewise-constant
    /// upsampling over blue/green/red bands.
    pub fn from_rgb(rgb: Vec3) -> Self {
        let rgb = rgb.to_array();
        if N == 3 {
            let mut out = Self::ZERO;
            out.c.copy_from_slice(&rgb[..N]);
            return out;
        }
        let mut out = Self::ZERO;
        for (i, v) in out.c.iter_mut().enumerate() {
            *v = rgb[Self::band(i)];
        }
        out
    }

    /// Project back to linear RGB.
    pub fn to_rgb(&self) -> Vec3 {
        if N == 3 {
            return Vec3::new(self.c[0], self.c[1], self.c[2]);
        }
        let mut sum = [0.0f32; 3];
        let mut count = [0u32; 3];
        for (i, v) in self.c.iter().enumerate() {
            let band = Self::band(i);
            sum[band] += v;
            count[band] += 1;
        }
        let avg = |b: usize| if count[b] == 0 { 0.0 } else { sum[b] / count[b] as f32 };
        Vec3::new(avg(0), avg(1), avg(2))
    }

    /// Rec. 709 luminance.
    pub fn y(&self) -> f32 {
        let rgb = self.to_rgb();
        0.2126 * rgb.x + 0.7152 * rgb.y + 0.0722 * rgb.z
    }
}

impl<const N: usize> From<Vec3> for CoefficientSpectrum<N> {
    fn from(rgb: Vec3) -> Self {
        Self::from_rgb(rgb)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $fn:ident, $assign_trait:ident, $assign_fn:ident, $op:tt) => {
        impl<const N: usize> $trait for CoefficientSpectrum<N> {
            type Output = Self;
            #[inline]
            fn $fn(mut self, rhs: Self) -> Self {
                for (a, b) in self.c.iter_mut().zip(rhs.c.iter()) {
                    *a = *a $op *b;
                }
                self
            }
        }

        impl<const N: usize> $trait<f32> for CoefficientSpectrum<N> {
            type Output = Self;
            #[inline]
            fn $fn(mut self, rhs: f32) -> Self {
                for a in self.c.iter_mut() {
                    *a = *a $op rhs;
                }
                self
            }
        }

        impl<const N: usize> $assign_trait for CoefficientSpectrum<N> {
            #[inline]
            fn $assign_fn(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }

        impl<const N: usize> $assign_trait<f32> for CoefficientSpectrum<N> {
            #[inline]
            fn $assign_fn(&mut self, rhs: f32) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, +);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, -);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, *);
impl_binary_op!(Div, div, DivAssign, div_assign, /);

impl<const N: usize> Mul<CoefficientSpectrum<N>> for f32 {
    type Output = CoefficientSpectrum<N>;
    #[inline]
    fn mul(self, rhs: CoefficientSpectrum<N>) -> CoefficientSpectrum<N> {
        rhs * self
    }
}

impl<const N: usize> Neg for CoefficientSpectrum<N> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

impl<const N: usize> Index<usize> for CoefficientSpectrum<N> {
    type Output = f32;
    #[inline]
    fn index(&self, i: usize) -> &f32 {
        &self.c[i]
    }
}

impl<const N: usize> IndexMut<usize> for CoefficientSpectrum<N> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.c[i]
    }
}
