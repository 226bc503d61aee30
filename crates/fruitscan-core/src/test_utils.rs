//! Shared test utilities for image-based unit tests.
//!
//! Synthetic scenes only; no fixture files. The neutral ground tone is
//! luma-matched to [`APPLE_RED`] so grayscale-based stages stay quiet in
//! color-path tests.

use image::{GrayImage, Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Saturated apple red; hue 0 in the 8-bit convention.
pub(crate) const APPLE_RED: Rgb<u8> = Rgb([200, 30, 30]);

/// Neutral ground, same luma as [`APPLE_RED`].
pub(crate) const GROUND: Rgb<u8> = Rgb([66, 66, 66]);

/// Paint a filled disc of `value` onto a grayscale image.
pub(crate) fn draw_disc(img: &mut GrayImage, cx: f32, cy: f32, r: f32, value: u8) {
    let (w, h) = img.dimensions();
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if (dx * dx + dy * dy).sqrt() <= r {
                img.put_pixel(x, y, Luma([value]));
            }
        }
    }
}

/// Paint a filled disc of `color` onto an RGB image.
pub(crate) fn draw_filled_circle(img: &mut RgbImage, cx: i32, cy: i32, r: i32, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let dx = x - cx;
            let dy = y - cy;
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// A mask with every pixel set to foreground.
pub(crate) fn full_mask(w: u32, h: u32) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([crate::segment::FOREGROUND]))
}

/// Render fruit discs `(cx, cy, r)` on the neutral ground.
pub(crate) fn fruit_scene(w: u32, h: u32, discs: &[(i32, i32, i32)], color: Rgb<u8>) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, GROUND);
    for &(cx, cy, r) in discs {
        draw_filled_circle(&mut img, cx, cy, r, color);
    }
    img
}

/// Deterministic non-overlapping disc centers for a `w` x `h` scene.
///
/// Centers keep a margin of `r + 4` from the borders and at least
/// `2 * r + 16` from each other.
pub(crate) fn scattered_discs(w: u32, h: u32, n: usize, r: i32, seed: u64) -> Vec<(i32, i32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let margin = r + 4;
    let min_gap_sq = ((2 * r + 16) * (2 * r + 16)) as i64;

    let mut centers: Vec<(i32, i32)> = Vec::with_capacity(n);
    let mut attempts = 0;
    while centers.len() < n {
        attempts += 1;
        assert!(attempts < 20_000, "scene too crowded for {n} discs of radius {r}");

        let cx = rng.gen_range(margin..w as i32 - margin);
        let cy = rng.gen_range(margin..h as i32 - margin);
        let clear = centers.iter().all(|&(px, py)| {
            let dx = (px - cx) as i64;
            let dy = (py - cy) as i64;
            dx * dx + dy * dy >= min_gap_sq
        });
        if clear {
            centers.push((cx, cy));
        }
    }
    centers
}
