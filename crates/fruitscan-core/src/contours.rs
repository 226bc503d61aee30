//! Contour-style region analysis of the cleaned mask.
//!
//! Connected components are measured (area, bounding box, traced perimeter)
//! and gated on area, circularity and aspect ratio. This is the only
//! detector active at the low tier and it complements the circle voter at
//! higher tiers: leaf-shaped and elongated regions die here even when their
//! color matched.

use std::collections::BTreeMap;
use std::f32::consts::{PI, SQRT_2};

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::profile::FruitProfile;
use crate::{CandidateRegion, CandidateSource};

/// Aspect-ratio window applied to every contour candidate.
const MIN_ASPECT: f32 = 0.5;
const MAX_ASPECT: f32 = 2.0;

#[derive(Debug)]
struct Blob {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    /// Topmost-leftmost pixel, where boundary tracing starts.
    start: (u32, u32),
}

/// Find contour candidates in the mask, gated by the profile.
///
/// Candidates come out in label order (top-to-bottom discovery), which keeps
/// the downstream merge deterministic.
pub fn find_contour_candidates(mask: &GrayImage, profile: &FruitProfile) -> Vec<CandidateRegion> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut blobs: BTreeMap<u32, Blob> = BTreeMap::new();
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0];
        if label == 0 {
            continue;
        }
        blobs
            .entry(label)
            .and_modify(|b| {
                b.area += 1;
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
            })
            .or_insert(Blob {
                area: 1,
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                start: (x, y),
            });
    }

    let mut candidates = Vec::new();
    for (label, blob) in &blobs {
        if blob.area < profile.min_area_px || blob.area > profile.max_area_px {
            continue;
        }

        let perimeter = trace_perimeter(&labels, *label, blob.start);
        if perimeter <= 0.0 {
            continue;
        }
        let circularity = 4.0 * PI * blob.area as f32 / (perimeter * perimeter);
        if circularity <= profile.shape_factor - 0.2 || circularity >= profile.shape_factor + 0.4 {
            continue;
        }

        let width = blob.max_x - blob.min_x + 1;
        let height = blob.max_y - blob.min_y + 1;
        let aspect = width as f32 / height as f32;
        if aspect <= MIN_ASPECT || aspect >= MAX_ASPECT {
            continue;
        }

        candidates.push(CandidateRegion {
            x: blob.min_x,
            y: blob.min_y,
            width,
            height,
            area: blob.area,
            source: CandidateSource::Contour,
        });
    }
    candidates
}

/// Length of the outer boundary of one labelled component.
///
/// Moore-neighbor tracing from the component's topmost-leftmost pixel,
/// scanning clockwise from the direction we entered. Diagonal steps count as
/// sqrt(2). Stops when the walk repeats its first move from the start pixel.
fn trace_perimeter(labels: &ImageBuffer<Luma<u32>, Vec<u32>>, label: u32, start: (u32, u32)) -> f32 {
    let (w, h) = labels.dimensions();
    let fg = |x: i64, y: i64| -> bool {
        x >= 0
            && y >= 0
            && (x as u32) < w
            && (y as u32) < h
            && labels.get_pixel(x as u32, y as u32)[0] == label
    };

    // Clockwise 8-neighborhood, index 0 pointing east.
    const STEP: [(i64, i64); 8] = [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];

    let sx = start.0 as i64;
    let sy = start.1 as i64;
    if !STEP.iter().any(|&(dx, dy)| fg(sx + dx, sy + dy)) {
        // Isolated pixel: the boundary is its own four sides.
        return 4.0;
    }

    let (mut cx, mut cy) = (sx, sy);
    // The pixel west of a topmost-leftmost start is background, so the
    // initial scan enters from the west.
    let mut back_dir = 4usize;
    let mut perimeter = 0.0f32;
    let mut first_move: Option<(i64, i64, usize)> = None;
    let max_steps = 4 * (w as usize * h as usize) + 8;

    for _ in 0..max_steps {
        let mut next = None;
        for i in 1..=8 {
            let d = (back_dir + i) % 8;
            let (dx, dy) = STEP[d];
            if fg(cx + dx, cy + dy) {
                next = Some(d);
                break;
            }
        }
        let Some(d) = next else { break };
        let (dx, dy) = STEP[d];
        let nx = cx + dx;
        let ny = cy + dy;

        match first_move {
            Some(fm) => {
                if (cx, cy) == (sx, sy) && fm == (nx, ny, d) {
                    break;
                }
            }
            None => first_move = Some((nx, ny, d)),
        }

        perimeter += if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };
        cx = nx;
        cy = ny;
        back_dir = (d + 4) % 8;
    }
    perimeter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{FruitProfile, ProfileSet};
    use crate::test_utils::draw_disc;

    fn disc_mask(w: u32, h: u32, cx: f32, cy: f32, r: f32) -> GrayImage {
        let mut mask = GrayImage::new(w, h);
        draw_disc(&mut mask, cx, cy, r, 255);
        mask
    }

    #[test]
    fn disc_passes_the_apple_gates() {
        let mask = disc_mask(100, 100, 50.0, 50.0, 30.0);
        let profile = ProfileSet::default().apple;
        let cands = find_contour_candidates(&mask, &profile);
        assert_eq!(cands.len(), 1);

        let c = &cands[0];
        assert_eq!(c.source, CandidateSource::Contour);
        // Bounding box of a radius-30 disc at (50, 50).
        assert!(c.x >= 18 && c.x <= 22, "x = {}", c.x);
        assert!(c.width >= 57 && c.width <= 62, "width = {}", c.width);
        let expected_area = PI * 30.0 * 30.0;
        assert!((c.area as f32 - expected_area).abs() / expected_area < 0.05);
    }

    #[test]
    fn elongated_regions_are_rejected() {
        let mut mask = GrayImage::new(120, 60);
        for y in 20..30 {
            for x in 10..110 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let profile = ProfileSet::default().apple;
        assert!(find_contour_candidates(&mask, &profile).is_empty());
    }

    #[test]
    fn area_bounds_include_the_endpoints() {
        // An 8x8 square: area 64, circularity ~1.03, aspect 1.0, so only
        // the area gate decides.
        let mut mask = GrayImage::new(40, 40);
        for y in 10..18 {
            for x in 10..18 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let base = ProfileSet::default().cherry;

        let at_min = FruitProfile {
            min_area_px: 64,
            ..base.clone()
        };
        assert_eq!(find_contour_candidates(&mask, &at_min).len(), 1);

        let at_max = FruitProfile {
            min_area_px: 10,
            max_area_px: 64,
            ..base.clone()
        };
        assert_eq!(find_contour_candidates(&mask, &at_max).len(), 1);

        let below = FruitProfile {
            min_area_px: 65,
            ..base
        };
        assert!(find_contour_candidates(&mask, &below).is_empty());
    }

    #[test]
    fn traced_perimeter_approximates_the_circumference() {
        let mask = disc_mask(100, 100, 50.0, 50.0, 25.0);
        let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));
        let start = (0..100u32)
            .flat_map(|y| (0..100u32).map(move |x| (x, y)))
            .find(|&(x, y)| labels.get_pixel(x, y)[0] != 0)
            .unwrap();
        let p = trace_perimeter(&labels, labels.get_pixel(start.0, start.1)[0], start);
        let circumference = 2.0 * PI * 25.0;
        assert!(
            (p - circumference).abs() / circumference < 0.12,
            "perimeter {p} vs circumference {circumference}"
        );
    }

    #[test]
    fn two_blobs_come_out_in_scan_order() {
        let mut mask = disc_mask(200, 100, 150.0, 60.0, 20.0);
        draw_disc(&mut mask, 50.0, 30.0, 20.0, 255);
        let profile = ProfileSet::default().apple;
        let cands = find_contour_candidates(&mask, &profile);
        assert_eq!(cands.len(), 2);
        // The blob whose top edge is higher is discovered first.
        assert!(cands[0].y < cands[1].y);
    }
}
