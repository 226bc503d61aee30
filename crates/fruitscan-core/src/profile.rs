//! Per-category color and geometry profiles.
//!
//! Every numeric tunable of the pipeline lives here or in a stage config, so
//! callers can retune any category without touching stage code. The built-in
//! table targets orchard photos taken from a few meters away.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Categories ──────────────────────────────────────────────────────────────

/// Supported fruit categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FruitKind {
    Apple,
    Pear,
    Cherry,
    Plum,
}

impl FruitKind {
    pub const ALL: [FruitKind; 4] = [
        FruitKind::Apple,
        FruitKind::Pear,
        FruitKind::Cherry,
        FruitKind::Plum,
    ];

    /// Parse an external category name.
    ///
    /// Unrecognized names fall back to [`FruitKind::Apple`], the default
    /// category; callers sending arbitrary strings still get a valid result.
    pub fn parse_lossy(name: &str) -> FruitKind {
        match name.trim().to_ascii_lowercase().as_str() {
            "pear" | "pears" => FruitKind::Pear,
            "cherry" | "cherries" => FruitKind::Cherry,
            "plum" | "plums" => FruitKind::Plum,
            _ => FruitKind::Apple,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FruitKind::Apple => "apple",
            FruitKind::Pear => "pear",
            FruitKind::Cherry => "cherry",
            FruitKind::Plum => "plum",
        }
    }
}

impl fmt::Display for FruitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Color ranges ────────────────────────────────────────────────────────────

/// Inclusive lower/upper bounds over one 3-channel pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub lo: [u8; 3],
    pub hi: [u8; 3],
}

impl ColorRange {
    pub const fn new(lo: [u8; 3], hi: [u8; 3]) -> Self {
        Self { lo, hi }
    }

    /// True when every channel of `px` lies inside the bounds.
    #[inline]
    pub fn contains(&self, px: [u8; 3]) -> bool {
        px[0] >= self.lo[0]
            && px[0] <= self.hi[0]
            && px[1] >= self.lo[1]
            && px[1] <= self.hi[1]
            && px[2] >= self.lo[2]
            && px[2] <= self.hi[2]
    }
}

// ── Profiles ────────────────────────────────────────────────────────────────

/// Tuning record for one fruit category.
///
/// Color ranges use the 8-bit conventions of [`crate::colorspace`]: hue in
/// [0, 180), Lab with a/b offset by +128. Red fruit carry two HSV ranges to
/// cover the hue wrap at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FruitProfile {
    /// HSV in-range windows, OR-combined. Always consulted.
    pub hsv_ranges: Vec<ColorRange>,
    /// Lab in-range windows, OR-combined. Consulted at medium/high tiers.
    pub lab_ranges: Vec<ColorRange>,
    /// Contour candidates below this pixel area are rejected.
    pub min_area_px: u32,
    /// Contour candidates above this pixel area are rejected.
    pub max_area_px: u32,
    /// Typical bounding-box area of a single fruit, for confidence scoring.
    pub expected_area_px: u32,
    /// Circularity midpoint for the contour gate; candidates must land in
    /// (shape_factor - 0.2, shape_factor + 0.4).
    pub shape_factor: f32,
    /// Smallest circle radius searched, pixels.
    pub min_radius_px: u32,
    /// Largest circle radius searched, pixels.
    pub max_radius_px: u32,
    /// Downscale factor of the circle vote accumulator (>= 1.0).
    pub accumulator_scale: f32,
}

/// The per-category profile table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSet {
    pub apple: FruitProfile,
    pub pear: FruitProfile,
    pub cherry: FruitProfile,
    pub plum: FruitProfile,
}

impl ProfileSet {
    pub fn get(&self, kind: FruitKind) -> &FruitProfile {
        match kind {
            FruitKind::Apple => &self.apple,
            FruitKind::Pear => &self.pear,
            FruitKind::Cherry => &self.cherry,
            FruitKind::Plum => &self.plum,
        }
    }

    pub fn get_mut(&mut self, kind: FruitKind) -> &mut FruitProfile {
        match kind {
            FruitKind::Apple => &mut self.apple,
            FruitKind::Pear => &mut self.pear,
            FruitKind::Cherry => &mut self.cherry,
            FruitKind::Plum => &mut self.plum,
        }
    }
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self {
            // Red fruit on green foliage: two red hue windows plus one for
            // green (unripe) apples.
            apple: FruitProfile {
                hsv_ranges: vec![
                    ColorRange::new([0, 100, 80], [10, 255, 255]),
                    ColorRange::new([170, 100, 80], [180, 255, 255]),
                    ColorRange::new([35, 40, 40], [85, 255, 200]),
                ],
                lab_ranges: vec![ColorRange::new([20, 120, 120], [255, 150, 200])],
                min_area_px: 200,
                max_area_px: 8000,
                expected_area_px: 3000,
                shape_factor: 0.6,
                min_radius_px: 15,
                max_radius_px: 50,
                accumulator_scale: 1.5,
            },
            pear: FruitProfile {
                hsv_ranges: vec![ColorRange::new([20, 40, 60], [45, 200, 220])],
                lab_ranges: vec![ColorRange::new([50, 120, 140], [200, 140, 180])],
                min_area_px: 300,
                max_area_px: 10000,
                expected_area_px: 4000,
                shape_factor: 0.5,
                min_radius_px: 20,
                max_radius_px: 60,
                accumulator_scale: 1.5,
            },
            cherry: FruitProfile {
                hsv_ranges: vec![
                    ColorRange::new([0, 120, 50], [10, 255, 180]),
                    ColorRange::new([170, 120, 50], [180, 255, 180]),
                ],
                lab_ranges: vec![ColorRange::new([10, 140, 150], [60, 180, 200])],
                min_area_px: 50,
                max_area_px: 2000,
                expected_area_px: 800,
                shape_factor: 0.7,
                min_radius_px: 5,
                max_radius_px: 25,
                accumulator_scale: 1.2,
            },
            plum: FruitProfile {
                hsv_ranges: vec![ColorRange::new([110, 40, 40], [140, 255, 200])],
                lab_ranges: vec![ColorRange::new([30, 130, 150], [80, 170, 200])],
                min_area_px: 150,
                max_area_px: 5000,
                expected_area_px: 2000,
                shape_factor: 0.65,
                min_radius_px: 10,
                max_radius_px: 40,
                accumulator_scale: 1.3,
            },
        }
    }
}
