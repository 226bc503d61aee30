//! Intensity-based fallback for frames the color stages miss.
//!
//! Poor lighting can leave every color range empty while the fruit is still
//! plainly visible as dark blobs against a lighter ground. This pass works
//! on the raw grayscale image: blur, inverted adaptive threshold against the
//! local mean, then a strict area gate on the surviving components. It runs
//! only when the color pipeline produced no detections.

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::{CandidateRegion, CandidateSource};

// ── Configuration ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RescueConfig {
    /// Pre-threshold smoothing.
    pub blur_sigma: f32,
    /// Half-width of the local-mean window; 5 gives an 11x11 block.
    pub block_radius: u32,
    /// A pixel is foreground when it sits this far below the local mean.
    pub offset: f32,
    /// Exclusive lower area bound for rescued components.
    pub min_area_px: u32,
    /// Exclusive upper area bound for rescued components.
    pub max_area_px: u32,
}

impl Default for RescueConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            block_radius: 5,
            offset: 2.0,
            min_area_px: 200,
            max_area_px: 5000,
        }
    }
}

// ── Rescue pass ────────────────────────────────────────────────────────────

/// Find dark compact regions in the raw grayscale frame.
pub fn rescue_candidates(gray: &GrayImage, config: &RescueConfig) -> Vec<CandidateRegion> {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let blurred = gaussian_blur_f32(gray, config.blur_sigma.max(0.1));
    let mask = adaptive_threshold_inv(&blurred, config.block_radius, config.offset);

    let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

    struct Blob {
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        area: u32,
    }
    let mut blobs: BTreeMap<u32, Blob> = BTreeMap::new();
    for y in 0..h {
        for x in 0..w {
            let label = labels.get_pixel(x, y).0[0];
            if label == 0 {
                continue;
            }
            let blob = blobs.entry(label).or_insert(Blob {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                area: 0,
            });
            blob.min_x = blob.min_x.min(x);
            blob.min_y = blob.min_y.min(y);
            blob.max_x = blob.max_x.max(x);
            blob.max_y = blob.max_y.max(y);
            blob.area += 1;
        }
    }

    let mut out = Vec::new();
    for blob in blobs.values() {
        if blob.area <= config.min_area_px || blob.area >= config.max_area_px {
            continue;
        }
        out.push(CandidateRegion {
            x: blob.min_x,
            y: blob.min_y,
            width: blob.max_x - blob.min_x + 1,
            height: blob.max_y - blob.min_y + 1,
            area: blob.area,
            source: CandidateSource::Contour,
        });
    }
    tracing::debug!(candidates = out.len(), "rescue pass complete");
    out
}

/// Inverted adaptive threshold: foreground where a pixel sits at least
/// `offset` below the arithmetic mean of its clamped block.
fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, offset: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let integral = integral_image::<_, u64>(gray);

    let mut mask = GrayImage::new(w, h);
    for y in 0..h {
        let top = y.saturating_sub(block_radius);
        let bottom = (y + block_radius).min(h - 1);
        for x in 0..w {
            let left = x.saturating_sub(block_radius);
            let right = (x + block_radius).min(w - 1);
            let sum = sum_image_pixels(&integral, left, top, right, bottom)[0];
            let count = ((right - left + 1) * (bottom - top + 1)) as f32;
            let mean = sum as f32 / count;
            let px = gray.get_pixel(x, y).0[0] as f32;
            if px <= mean - offset {
                mask.put_pixel(x, y, Luma([crate::segment::FOREGROUND]));
            }
        }
    }
    mask
}
