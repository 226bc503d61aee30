//! fruitscan-core — fruit detection and counting for orchard photos.
//!
//! Classic color/shape computer vision, no learned models. The pipeline
//! stages are:
//!
//! 1. **Preprocess** – CLAHE contrast enhancement on the HSV value channel,
//!    optional saturation boost and denoising.
//! 2. **Segment** – per-category HSV (and Lab) color ranges → binary mask.
//! 3. **Clean** – morphological open/close plus small-component removal.
//! 4. **Detect** – two independent strategies on the cleaned mask:
//!    gradient-voting circle search and contour analysis with
//!    circularity/aspect gates.
//! 5. **Merge** – running-average clustering of candidates from both
//!    strategies into one box per fruit.
//! 6. **Score** – heuristic confidence from count, size match and spread.
//! 7. **Calibrate** – per-category multiplicative count correction learned
//!    from reference photos.
//!
//! [`FruitDetector`] is the public entry point; [`DetectionReport`] the only
//! public result. Every call returns a structurally valid report, including
//! on undecodable input.

pub mod calibration;
pub mod circles;
pub mod colorspace;
pub mod confidence;
pub mod contours;
pub mod engine;
pub mod error;
pub mod merge;
pub mod morphology;
pub mod pipeline;
pub mod preprocess;
pub mod profile;
pub mod recommend;
pub mod rescue;
pub mod segment;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod tier;

pub use engine::FruitDetector;
pub use error::DetectError;
pub use merge::MergedDetection;
pub use pipeline::{DetectConfig, PipelineOutput, Stage};
pub use profile::{ColorRange, FruitKind, FruitProfile, ProfileSet};
pub use tier::{AccuracyTier, TierPolicy};

/// Strategy tag carried by successful reports.
pub const METHOD_MULTI: &str = "multi_method";
/// Strategy tag carried by recovered-failure reports.
pub const METHOD_FALLBACK: &str = "error_fallback";

/// Where a raw candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Circle,
    Contour,
}

/// One raw detected region from a single strategy, before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Pixel area: mask pixels for contours, box area for circles.
    pub area: u32,
    pub source: CandidateSource,
}

impl CandidateRegion {
    /// Box center in pixel coordinates.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Enclosing box of a detected circle, clamped to the top-left image
    /// corner. Circles whose rounded box would leave the image are dropped.
    pub fn from_circle(circle: &circles::Circle, image_w: u32, image_h: u32) -> Option<Self> {
        let r = circle.radius.round() as i64;
        if r <= 0 {
            return None;
        }
        let x = (circle.cx.round() as i64 - r).max(0) as u32;
        let y = (circle.cy.round() as i64 - r).max(0) as u32;
        let width = (2 * r) as u32;
        let height = width;
        if x + width > image_w || y + height > image_h {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
            area: width * height,
            source: CandidateSource::Circle,
        })
    }
}

/// Axis-aligned detection box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Integer box of a merged detection. Coordinates truncate, which keeps
    /// `x + width` within the image for any average of in-image boxes.
    pub fn from_detection(det: &MergedDetection) -> Self {
        Self {
            x: det.x as u32,
            y: det.y as u32,
            width: det.width as u32,
            height: det.height as u32,
        }
    }
}

/// Per-category slice of a report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FruitGroup {
    /// Detected category.
    pub fruit_type: FruitKind,
    /// Calibrated count for this category.
    pub count: u32,
    /// Group confidence in [0, 1]; equals the report confidence while
    /// detection runs one category per call.
    pub confidence: f64,
    /// One box per merged detection.
    pub boxes: Vec<BoundingBox>,
}

/// Stage counters attached at the high accuracy tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStats {
    /// Raw circle candidates before merging.
    pub circle_candidates: usize,
    /// Raw contour candidates before merging.
    pub contour_candidates: usize,
    /// Detections after merging.
    pub merged: usize,
    /// Regions recovered by the rescue pass.
    pub rescued: usize,
}

/// Full detection result for a single image.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    /// Calibrated total across all groups.
    pub total_count: u32,
    pub groups: Vec<FruitGroup>,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
    /// Strategy tag: [`METHOD_MULTI`] or [`METHOD_FALLBACK`].
    pub method: String,
    /// Advice text for the grower.
    pub recommendations: String,
    /// Image dimensions [width, height]; [0, 0] when decoding failed.
    pub image_size: [u32; 2],
    /// Tier the report was produced at.
    pub tier: AccuracyTier,
    /// Per-stage counters (high tier only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DetectionStats>,
    /// What went wrong, on the recovered-failure path only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circles::Circle;

    #[test]
    fn circle_boxes_are_clamped_or_dropped() {
        // Fully inside.
        let c = Circle {
            cx: 50.0,
            cy: 40.0,
            radius: 10.0,
            score: 1.0,
        };
        let region = CandidateRegion::from_circle(&c, 100, 100).unwrap();
        assert_eq!((region.x, region.y), (40, 30));
        assert_eq!((region.width, region.height), (20, 20));
        assert_eq!(region.area, 400);
        assert_eq!(region.source, CandidateSource::Circle);

        // Pokes over the top-left corner: clamped to 0, still inside.
        let c = Circle {
            cx: 5.0,
            cy: 5.0,
            radius: 10.0,
            score: 1.0,
        };
        let region = CandidateRegion::from_circle(&c, 100, 100).unwrap();
        assert_eq!((region.x, region.y), (0, 0));

        // Pokes over the bottom-right corner: dropped.
        let c = Circle {
            cx: 95.0,
            cy: 95.0,
            radius: 10.0,
            score: 1.0,
        };
        assert!(CandidateRegion::from_circle(&c, 100, 100).is_none());
    }

    #[test]
    fn detection_boxes_truncate() {
        let det = MergedDetection {
            x: 10.6,
            y: 20.4,
            width: 30.9,
            height: 31.2,
            area: 30.9 * 31.2,
            support: 2,
        };
        let b = BoundingBox::from_detection(&det);
        assert_eq!((b.x, b.y, b.width, b.height), (10, 20, 30, 31));
    }
}
