//! Gradient-voting circle detection.
//!
//! For each pixel with a strong gradient, votes are cast along the gradient
//! direction at every radius in the profile's search band. Round fruit
//! produce peaks in the accumulator at their centers because boundary
//! gradients converge radially. Peaks are extracted with non-maximum
//! suppression, then each center's radius is re-estimated from the edge
//! pixels that support it.

use image::GrayImage;

use crate::profile::FruitProfile;

/// Configuration for the circle search.
#[derive(Debug, Clone)]
pub struct CircleSearchConfig {
    /// Gradient magnitude threshold (fraction of max gradient).
    pub grad_threshold: f32,
    /// Minimum accumulator value for a center (fraction of max).
    pub min_vote_frac: f32,
    /// Gaussian sigma for accumulator smoothing, in accumulator pixels.
    pub accum_sigma: f32,
    /// Cosine of the worst gradient/center alignment that still counts
    /// toward radius estimation.
    pub radius_align_cos: f32,
}

impl Default for CircleSearchConfig {
    fn default() -> Self {
        Self {
            grad_threshold: 0.2,
            min_vote_frac: 0.4,
            accum_sigma: 2.0,
            radius_align_cos: 0.8,
        }
    }
}

/// A detected circle with its accumulated vote score.
#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    pub score: f32,
}

/// One edge pixel with its unit gradient direction and magnitude.
struct EdgePoint {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    mag: f32,
}

/// Deposit a weighted vote into the accumulator using bilinear interpolation.
#[inline]
fn bilinear_add(accum: &mut [f32], w: u32, h: u32, x: f32, y: f32, weight: f32) {
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= w || y0 + 1 >= h {
        return;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let stride = w as usize;
    let base = y0 as usize * stride + x0 as usize;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Detect circles inside the masked grayscale image.
///
/// `vote_scale` multiplies the vote threshold; values above 1.0 make the
/// search stricter. Returns circles sorted by score (highest first).
pub fn find_circles(
    gray: &GrayImage,
    mask: &GrayImage,
    profile: &FruitProfile,
    config: &CircleSearchConfig,
    vote_scale: f32,
) -> Vec<Circle> {
    let (w, h) = gray.dimensions();
    if w < 4 || h < 4 {
        return Vec::new();
    }

    // Zero everything outside the mask so foliage edges cannot vote.
    let mut masked = gray.clone();
    for (m, g) in mask.pixels().zip(masked.pixels_mut()) {
        if m[0] == 0 {
            g[0] = 0;
        }
    }

    let edges = collect_edge_points(&masked, config.grad_threshold);
    if edges.is_empty() {
        return Vec::new();
    }

    // Vote in a downscaled center accumulator.
    let scale = profile.accumulator_scale.max(1.0);
    let aw = ((w as f32 / scale).ceil() as u32).max(2);
    let ah = ((h as f32 / scale).ceil() as u32).max(2);
    let mut accum = vec![0.0f32; (aw * ah) as usize];

    let r_min = profile.min_radius_px as f32;
    let r_max = profile.max_radius_px as f32;
    for e in &edges {
        for sign in [-1.0f32, 1.0] {
            let mut r = r_min;
            while r <= r_max {
                let vx = (e.x + sign * e.dx * r) / scale;
                let vy = (e.y + sign * e.dy * r) / scale;
                if vx >= 0.0 && vy >= 0.0 {
                    bilinear_add(&mut accum, aw, ah, vx, vy, e.mag);
                }
                r += 1.0;
            }
        }
    }

    // Smooth the accumulator before peak extraction.
    let accum_img = image::ImageBuffer::<image::Luma<f32>, Vec<f32>>::from_raw(aw, ah, accum)
        .expect("accumulator dimensions match");
    let smoothed = imageproc::filter::gaussian_blur_f32(&accum_img, config.accum_sigma);
    let votes = smoothed.as_raw();

    let max_val = votes.iter().cloned().fold(0.0f32, f32::max);
    if max_val < 1e-6 {
        return Vec::new();
    }
    let threshold = (config.min_vote_frac * vote_scale).min(1.0) * max_val;
    // Centers closer than one fruit diameter are the same fruit.
    let nms_r = ((2.0 * r_min / scale).ceil() as i32).max(1);

    let mut circles = Vec::new();
    for ay in 0..ah as i32 {
        for ax in 0..aw as i32 {
            let idx = ay as usize * aw as usize + ax as usize;
            let val = votes[idx];
            if val < threshold {
                continue;
            }
            if !is_local_max(votes, aw, ah, ax, ay, nms_r, val, idx) {
                continue;
            }
            let cx = ax as f32 * scale;
            let cy = ay as f32 * scale;
            if let Some(radius) = estimate_radius(&edges, cx, cy, r_min, r_max, config) {
                circles.push(Circle {
                    cx,
                    cy,
                    radius,
                    score: val,
                });
            }
        }
    }

    circles.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    circles
}

fn collect_edge_points(gray: &GrayImage, grad_threshold: f32) -> Vec<EdgePoint> {
    let (w, h) = gray.dimensions();
    let gx = imageproc::gradients::horizontal_scharr(gray);
    let gy = imageproc::gradients::vertical_scharr(gray);

    let mut max_mag_sq = 0.0f32;
    for y in 0..h {
        for x in 0..w {
            let gxv = gx.get_pixel(x, y)[0] as f32;
            let gyv = gy.get_pixel(x, y)[0] as f32;
            max_mag_sq = max_mag_sq.max(gxv * gxv + gyv * gyv);
        }
    }
    let max_mag = max_mag_sq.sqrt();
    if max_mag < 1e-6 {
        return Vec::new();
    }
    let threshold = grad_threshold * max_mag;

    let mut edges = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let gxv = gx.get_pixel(x, y)[0] as f32;
            let gyv = gy.get_pixel(x, y)[0] as f32;
            let mag = (gxv * gxv + gyv * gyv).sqrt();
            if mag < threshold {
                continue;
            }
            edges.push(EdgePoint {
                x: x as f32,
                y: y as f32,
                dx: gxv / mag,
                dy: gyv / mag,
                mag,
            });
        }
    }
    edges
}

#[inline]
fn is_local_max(
    votes: &[f32],
    aw: u32,
    ah: u32,
    ax: i32,
    ay: i32,
    nms_r: i32,
    val: f32,
    idx: usize,
) -> bool {
    let r_sq = (nms_r * nms_r) as f32;
    for dy in -nms_r..=nms_r {
        let ny = ay + dy;
        if ny < 0 || ny >= ah as i32 {
            continue;
        }
        for dx in -nms_r..=nms_r {
            if dx == 0 && dy == 0 {
                continue;
            }
            if ((dx * dx + dy * dy) as f32) > r_sq {
                continue;
            }
            let nx = ax + dx;
            if nx < 0 || nx >= aw as i32 {
                continue;
            }
            let nidx = ny as usize * aw as usize + nx as usize;
            let nval = votes[nidx];
            if nval > val || (nval == val && nidx < idx) {
                return false;
            }
        }
    }
    true
}

/// Histogram vote over edge pixels whose gradient points at (or away from)
/// the center. Returns the winning radius, or None when no edge supports
/// this center.
fn estimate_radius(
    edges: &[EdgePoint],
    cx: f32,
    cy: f32,
    r_min: f32,
    r_max: f32,
    config: &CircleSearchConfig,
) -> Option<f32> {
    let n_bins = (r_max - r_min) as usize + 1;
    let mut hist = vec![0.0f32; n_bins];

    for e in edges {
        let ox = e.x - cx;
        let oy = e.y - cy;
        let d = (ox * ox + oy * oy).sqrt();
        if d < r_min - 1.0 || d > r_max + 1.0 || d < 1e-3 {
            continue;
        }
        let align = (ox * e.dx + oy * e.dy).abs() / d;
        if align < config.radius_align_cos {
            continue;
        }
        let bin = ((d - r_min).round() as i64).clamp(0, n_bins as i64 - 1) as usize;
        hist[bin] += e.mag;
    }

    let (best_bin, best_votes) = hist
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())?;
    if *best_votes <= 0.0 {
        return None;
    }
    Some(r_min + best_bin as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileSet;
    use crate::test_utils::{draw_disc, full_mask};

    #[test]
    fn finds_a_single_disc() {
        let mut gray = GrayImage::new(120, 120);
        draw_disc(&mut gray, 60.0, 60.0, 25.0, 200);
        let mask = full_mask(120, 120);

        let profile = ProfileSet::default().apple;
        let circles = find_circles(
            &gray,
            &mask,
            &profile,
            &CircleSearchConfig::default(),
            1.0,
        );

        assert!(!circles.is_empty(), "disc not found");
        let best = &circles[0];
        let err = ((best.cx - 60.0).powi(2) + (best.cy - 60.0).powi(2)).sqrt();
        assert!(err < 5.0, "center off by {err}px: {best:?}");
        assert!(
            (best.radius - 25.0).abs() <= 3.0,
            "radius {} should be near 25",
            best.radius
        );
    }

    #[test]
    fn separated_discs_yield_separate_centers() {
        let mut gray = GrayImage::new(200, 120);
        draw_disc(&mut gray, 50.0, 60.0, 22.0, 210);
        draw_disc(&mut gray, 150.0, 60.0, 22.0, 210);
        let mask = full_mask(200, 120);

        let profile = ProfileSet::default().apple;
        let circles = find_circles(
            &gray,
            &mask,
            &profile,
            &CircleSearchConfig::default(),
            1.0,
        );

        assert_eq!(circles.len(), 2, "got {circles:?}");
        let mut xs: Vec<f32> = circles.iter().map(|c| c.cx).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((xs[0] - 50.0).abs() < 6.0);
        assert!((xs[1] - 150.0).abs() < 6.0);
    }

    #[test]
    fn masked_out_discs_are_invisible() {
        let mut gray = GrayImage::new(120, 120);
        draw_disc(&mut gray, 60.0, 60.0, 25.0, 200);
        // All-background mask suppresses every gradient.
        let mask = GrayImage::new(120, 120);

        let profile = ProfileSet::default().apple;
        let circles = find_circles(
            &gray,
            &mask,
            &profile,
            &CircleSearchConfig::default(),
            1.0,
        );
        assert!(circles.is_empty());
    }

    #[test]
    fn tiny_images_are_rejected() {
        let gray = GrayImage::new(3, 3);
        let mask = full_mask(3, 3);
        let profile = ProfileSet::default().cherry;
        assert!(find_circles(&gray, &mask, &profile, &CircleSearchConfig::default(), 1.0)
            .is_empty());
    }
}
