//! Tile-based image partitioning.
//!
//! Divides the image into tiles that are rendered independently and in
//! parallel. Each tile owns its sampler and its pixel range.

use kestrel_math::Vec3;

use crate::camera::Camera;
use crate::integrator::Integrator;
use crate::sampler::Sampler;
use crate::scene::Scene;

/// A rectangular region of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position of this tile in the render order
    pub index: usize,
}

impl Tile {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Global pixel coordinates of the tile, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 32;

/// Split a `width` x `height` image into tiles of at most `tile_size`
/// square, ordered from the image centre outwards.
pub fn generate_tiles(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    let tile_size = tile_size.max(1);
    let mut tiles = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let tw = tile_size.min(width - x);
            let th = tile_size.min(height - y);
            tiles.push(Tile::new(x, y, tw, th, tiles.len()));
            x += tile_size;
        }
        y += tile_size;
    }

    sort_spiral(&mut tiles, width, height);
    for (i, tile) in tiles.iter_mut().enumerate() {
        tile.index = i;
    }

    tiles
}

/// Sort tiles by the distance of their centre to the image centre.
fn sort_spiral(tiles: &mut [Tile], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let dist = |t: &Tile| {
        let dx = t.x as f32 + t.width as f32 / 2.0 - center_x;
        let dy = t.y as f32 + t.height as f32 / 2.0 - center_y;
        dx * dx + dy * dy
    };

    tiles.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
}

/// Pixels of one rendered tile, row-major within the tile.
#[derive(Debug, Clone)]
pub struct TileResult {
    pub tile: Tile,
    pub pixels: Vec<Vec3>,
}

/// Render every pixel of `tile` with `sampler`, which the caller owns
/// exclusively for the duration of the tile.
pub fn render_tile(
    tile: &Tile,
    camera: &Camera,
    scene: &Scene,
    integrator: &dyn Integrator,
    sampler: &mut dyn Sampler,
) -> TileResult {
    let (width, height) = camera.resolution();
    let mut pixels = Vec::with_capacity(tile.pixel_count() as usize);

    for (x, y) in tile.pixels() {
        sampler.start_pixel(x, y);
        let mut sum = Vec3::ZERO;
        let mut count = 0u32;
        loop {
            let jitter = sampler.get_2d();
            let s = (x as f32 + jitter.x) / width as f32;
            let t = (y as f32 + jitter.y) / height as f32;
            let ray = camera.generate_ray(s, t);

            let l = integrator.li(ray, scene, sampler);
            if l.has_nans() {
                log::warn!("NaN radiance at pixel ({}, {})", x, y);
            } else {
                sum += l.to_rgb();
            }
            count += 1;

            if !sampler.start_next_sample() {
                break;
            }
        }
        pixels.push(sum / count as f32);
    }

    TileResult { tile: *tile, pixels }
}
