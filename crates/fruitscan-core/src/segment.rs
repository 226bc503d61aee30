//! Color-range segmentation.
//!
//! Builds one binary foreground mask per detection run by OR-combining all
//! active color windows of the category profile.

use image::{GrayImage, Luma, RgbImage};

use crate::colorspace::{rgb_to_hsv8, rgb_to_lab8};
use crate::profile::FruitProfile;

/// Foreground value of binary masks throughout the crate.
pub const FOREGROUND: u8 = 255;

/// Build the foreground mask for one profile.
///
/// HSV windows always apply; the profile's Lab windows join the union when
/// `use_lab` is set. A pixel matching any window becomes foreground.
pub fn build_mask(img: &RgbImage, profile: &FruitProfile, use_lab: bool) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut mask = GrayImage::new(w, h);
    let check_lab = use_lab && !profile.lab_ranges.is_empty();

    for (x, y, px) in img.enumerate_pixels() {
        let rgb = [px[0], px[1], px[2]];
        let hsv = rgb_to_hsv8(rgb);
        let mut hit = profile.hsv_ranges.iter().any(|r| r.contains(hsv));
        if !hit && check_lab {
            let lab = rgb_to_lab8(rgb);
            hit = profile.lab_ranges.iter().any(|r| r.contains(lab));
        }
        if hit {
            mask.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }
    mask
}

/// Number of foreground pixels in a mask.
pub fn foreground_area(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] != 0).count() as u64
}
