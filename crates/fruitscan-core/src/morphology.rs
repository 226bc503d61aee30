//! Binary mask cleanup between segmentation and region analysis.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::segment::FOREGROUND;

/// Open then close the mask with a square structuring element of the given
/// radius, optionally discarding small connected components afterwards.
///
/// Opening removes speckle noise; closing fills pinholes inside fruit
/// regions. `min_component_area` is the pre-filter threshold in pixels.
pub fn clean_mask(mask: &GrayImage, radius: u8, min_component_area: Option<u32>) -> GrayImage {
    let opened = imageproc::morphology::open(mask, Norm::LInf, radius);
    let closed = imageproc::morphology::close(&opened, Norm::LInf, radius);
    match min_component_area {
        Some(min_area) if min_area > 0 => drop_small_components(&closed, min_area),
        _ => closed,
    }
}

/// Rebuild the mask keeping only connected components of at least `min_area`
/// pixels (8-connectivity).
pub fn drop_small_components(mask: &GrayImage, min_area: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut areas: HashMap<u32, u32> = HashMap::new();
    for px in labels.pixels() {
        if px[0] != 0 {
            *areas.entry(px[0]).or_insert(0) += 1;
        }
    }

    let mut out = GrayImage::new(w, h);
    for (x, y, px) in labels.enumerate_pixels() {
        if px[0] != 0 && areas[&px[0]] >= min_area {
            out.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }
    out
}
