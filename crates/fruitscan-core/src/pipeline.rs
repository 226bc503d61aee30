//! Stage sequencing for one detection run.
//!
//! `run` takes a decoded image and a fruit category through the fixed stage
//! order: preprocess, segment, clean, detect (circles and contours), merge,
//! optional rescue, score. Which stages actually execute is decided by the
//! [`TierPolicy`] for the configured tier, never by tier checks inside the
//! stages themselves. Calibration and report assembly happen in the engine.

use image::imageops;
use image::RgbImage;

use crate::circles::{self, CircleSearchConfig};
use crate::confidence::{self, ConfidenceConfig};
use crate::contours;
use crate::merge::{self, MergeConfig, MergedDetection};
use crate::morphology;
use crate::preprocess::{self, PreprocessConfig};
use crate::profile::{FruitKind, ProfileSet};
use crate::rescue::{self, RescueConfig};
use crate::segment;
use crate::tier::AccuracyTier;
use crate::{CandidateRegion, DetectionStats};

// ── Stages ─────────────────────────────────────────────────────────────────

/// Pipeline stages, in execution order. Used for logs and failure context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Preprocess,
    Segment,
    Clean,
    Detect,
    Merge,
    Rescue,
    Score,
    Calibrate,
    Assemble,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Preprocess => "preprocess",
            Stage::Segment => "segment",
            Stage::Clean => "clean",
            Stage::Detect => "detect",
            Stage::Merge => "merge",
            Stage::Rescue => "rescue",
            Stage::Score => "score",
            Stage::Calibrate => "calibrate",
            Stage::Assemble => "assemble",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Configuration ──────────────────────────────────────────────────────────

/// Top-level detection configuration.
#[derive(Debug, Clone)]
pub struct DetectConfig {
    /// Accuracy tier; expands to a [`crate::tier::TierPolicy`] at run time.
    pub tier: AccuracyTier,
    /// Per-category color, size and radius configuration.
    pub profiles: ProfileSet,
    pub preprocess: PreprocessConfig,
    pub circle: CircleSearchConfig,
    pub merge: MergeConfig,
    pub confidence: ConfidenceConfig,
    pub rescue: RescueConfig,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            tier: AccuracyTier::default(),
            profiles: ProfileSet::default(),
            preprocess: PreprocessConfig::default(),
            circle: CircleSearchConfig::default(),
            merge: MergeConfig::default(),
            confidence: ConfidenceConfig::default(),
            rescue: RescueConfig::default(),
        }
    }
}

/// Everything a single pipeline run produces, before calibration.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub merged: Vec<MergedDetection>,
    /// Uncalibrated detection count, `merged.len()`.
    pub raw_count: u32,
    pub confidence: f64,
    /// Per-stage counters, populated only when the tier asks for them.
    pub stats: Option<DetectionStats>,
}

// ── Orchestrator ───────────────────────────────────────────────────────────

/// Run the detection pipeline on a decoded image.
pub fn run(img: &RgbImage, kind: FruitKind, config: &DetectConfig) -> PipelineOutput {
    let (w, h) = img.dimensions();
    let policy = config.tier.policy();
    let profile = config.profiles.get(kind);

    // Stage 1: contrast enhancement.
    let enhanced = preprocess::preprocess(img, &config.preprocess, &policy);

    // Stage 2: color segmentation.
    let mask = segment::build_mask(&enhanced, profile, policy.use_lab);
    tracing::debug!(
        stage = %Stage::Segment,
        "{} foreground pixels",
        segment::foreground_area(&mask)
    );

    // Stage 3: morphological cleanup.
    let min_component = if policy.prefilter_components {
        Some(profile.min_area_px / 2)
    } else {
        None
    };
    let cleaned = morphology::clean_mask(&mask, policy.morph_radius, min_component);

    // Stage 4: candidate generation, circles first.
    let mut candidates: Vec<CandidateRegion> = Vec::new();
    let mut circle_count = 0usize;
    if policy.use_circles {
        let gray = imageops::grayscale(&enhanced);
        let found = circles::find_circles(&gray, &cleaned, profile, &config.circle, policy.vote_scale);
        circle_count = found.len();
        candidates.extend(
            found
                .iter()
                .filter_map(|c| CandidateRegion::from_circle(c, w, h)),
        );
    }
    let contour_candidates = contours::find_contour_candidates(&cleaned, profile);
    let contour_count = contour_candidates.len();
    candidates.extend(contour_candidates);
    tracing::debug!(
        stage = %Stage::Detect,
        "{} circle and {} contour candidates",
        circle_count,
        contour_count
    );

    // Stage 5: merge overlapping candidates from both detectors.
    let mut merged = merge::merge_candidates(&candidates, &config.merge);

    // Stage 5b: one deterministic rescue attempt when nothing was found.
    let mut rescued_count = 0usize;
    if merged.is_empty() && policy.rescue_pass {
        let raw_gray = imageops::grayscale(img);
        let rescued = rescue::rescue_candidates(&raw_gray, &config.rescue);
        rescued_count = rescued.len();
        if !rescued.is_empty() {
            tracing::debug!(stage = %Stage::Rescue, "{} regions rescued", rescued_count);
            merged = merge::merge_candidates(&rescued, &config.merge);
        }
    }

    // Stage 6: confidence scoring.
    let confidence = confidence::score_confidence(
        &merged,
        profile.expected_area_px as f64,
        w as f64 * h as f64,
        policy.base_confidence,
        &config.confidence,
    );

    let stats = if policy.include_stats {
        Some(DetectionStats {
            circle_candidates: circle_count,
            contour_candidates: contour_count,
            merged: merged.len(),
            rescued: rescued_count,
        })
    } else {
        None
    };

    tracing::info!(
        fruit = kind.name(),
        tier = config.tier.name(),
        "{} detections at {:.2} confidence",
        merged.len(),
        confidence
    );

    PipelineOutput {
        raw_count: merged.len() as u32,
        merged,
        confidence,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{draw_filled_circle, fruit_scene, APPLE_RED};

    #[test]
    fn red_discs_are_detected_as_apples() {
        let img = fruit_scene(400, 300, &[(100, 100, 30), (300, 180, 32)], APPLE_RED);
        let out = run(&img, FruitKind::Apple, &DetectConfig::default());

        assert_eq!(out.raw_count as usize, out.merged.len());
        assert!(
            (1..=3).contains(&out.raw_count),
            "expected about two detections, got {}",
            out.raw_count
        );
        assert!(out.confidence >= 0.5 && out.confidence <= 0.95);
    }

    #[test]
    fn boxes_stay_inside_the_image() {
        let img = fruit_scene(
            320,
            240,
            &[(30, 30, 28), (290, 210, 28), (160, 120, 30)],
            APPLE_RED,
        );
        let out = run(&img, FruitKind::Apple, &DetectConfig::default());

        for det in &out.merged {
            assert!(det.x >= 0.0 && det.y >= 0.0);
            assert!(det.x + det.width <= 320.0);
            assert!(det.y + det.height <= 240.0);
        }
    }

    #[test]
    fn low_tier_skips_circles_and_stats() {
        let img = fruit_scene(300, 300, &[(150, 150, 30)], APPLE_RED);
        let config = DetectConfig {
            tier: AccuracyTier::Low,
            ..DetectConfig::default()
        };
        let out = run(&img, FruitKind::Apple, &config);
        assert!(out.stats.is_none());
        assert!(out.confidence <= 0.95);
    }

    #[test]
    fn high_tier_reports_stats() {
        let img = fruit_scene(300, 300, &[(150, 150, 30)], APPLE_RED);
        let config = DetectConfig {
            tier: AccuracyTier::High,
            ..DetectConfig::default()
        };
        let out = run(&img, FruitKind::Apple, &config);
        let stats = out.stats.expect("high tier carries stats");
        assert_eq!(stats.merged, out.merged.len());
    }

    #[test]
    fn wrong_category_finds_nothing_on_clean_ground() {
        // Red discs do not fall inside the plum (blue-violet) ranges, and the
        // ground shares their luma, so the dark-region rescue pass stays quiet.
        let img = fruit_scene(300, 300, &[(150, 150, 30)], APPLE_RED);
        let out = run(&img, FruitKind::Plum, &DetectConfig::default());
        assert_eq!(out.raw_count, 0);
        assert_eq!(out.confidence, ConfidenceConfig::default().empty_confidence);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let img = fruit_scene(
            360,
            280,
            &[(80, 80, 26), (200, 150, 30), (300, 220, 28)],
            APPLE_RED,
        );
        let config = DetectConfig::default();
        let a = run(&img, FruitKind::Apple, &config);
        let b = run(&img, FruitKind::Apple, &config);
        assert_eq!(a.raw_count, b.raw_count);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.merged.len(), b.merged.len());
        for (da, db) in a.merged.iter().zip(&b.merged) {
            assert_eq!((da.x, da.y, da.width, da.height), (db.x, db.y, db.width, db.height));
        }
    }

    #[test]
    fn dark_fruit_in_dim_light_is_rescued() {
        // Dull near-gray discs miss every plum color range but sit well below
        // the light ground, so the medium-tier rescue pass picks them up.
        let mut img = RgbImage::from_pixel(300, 200, image::Rgb([210, 210, 205]));
        draw_filled_circle(&mut img, 90, 100, 24, image::Rgb([70, 68, 66]));
        draw_filled_circle(&mut img, 210, 100, 24, image::Rgb([70, 68, 66]));

        let out = run(&img, FruitKind::Plum, &DetectConfig::default());
        assert!(out.raw_count >= 1, "rescue pass should find the dark discs");
    }
}
