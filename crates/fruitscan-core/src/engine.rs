//! Public detection engine.
//!
//! [`FruitDetector`] is the create-once, detect-many facade over the
//! pipeline. Every entry point returns a structurally valid
//! [`DetectionReport`]; failures are recovered into a fallback report with
//! the `error` field populated instead of surfacing as `Err` or a panic.

use image::RgbImage;

use crate::calibration::CalibrationStore;
use crate::error::DetectError;
use crate::pipeline::{self, DetectConfig, Stage};
use crate::profile::FruitKind;
use crate::recommend;
use crate::tier::AccuracyTier;
use crate::{BoundingBox, DetectionReport, FruitGroup, METHOD_FALLBACK, METHOD_MULTI};

// ── Engine ─────────────────────────────────────────────────────────────────

/// Fruit detection and counting engine.
///
/// Holds the detection configuration and the per-category calibration
/// factors. All methods take `&self`; the calibration store is internally
/// synchronized, so one engine can serve many threads.
#[derive(Debug, Default)]
pub struct FruitDetector {
    config: DetectConfig,
    calibration: CalibrationStore,
}

impl FruitDetector {
    /// Engine with default configuration at the given tier.
    pub fn new(tier: AccuracyTier) -> Self {
        Self::with_config(DetectConfig {
            tier,
            ..DetectConfig::default()
        })
    }

    pub fn with_config(config: DetectConfig) -> Self {
        Self {
            config,
            calibration: CalibrationStore::new(),
        }
    }

    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DetectConfig {
        &mut self.config
    }

    /// Detect fruit in encoded image bytes.
    ///
    /// The category string is normalized leniently; unknown names fall back
    /// to apple. Undecodable bytes yield the fallback report, never an error.
    pub fn detect_bytes(&self, bytes: &[u8], fruit: &str) -> DetectionReport {
        let kind = FruitKind::parse_lossy(fruit);
        match decode_rgb(bytes) {
            Ok(img) => self.detect_image(&img, kind),
            Err(err) => {
                tracing::warn!(fruit = kind.name(), "{err}");
                self.failure_report(kind, &err)
            }
        }
    }

    /// Detect fruit in an already decoded image.
    pub fn detect_image(&self, img: &RgbImage, kind: FruitKind) -> DetectionReport {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return self.failure_report(kind, &DetectError::EmptyImage);
        }

        let out = pipeline::run(img, kind, &self.config);
        let count = self.calibration.apply(kind, out.raw_count);
        let boxes: Vec<BoundingBox> = out.merged.iter().map(BoundingBox::from_detection).collect();

        DetectionReport {
            total_count: count,
            groups: vec![FruitGroup {
                fruit_type: kind,
                count,
                confidence: out.confidence,
                boxes,
            }],
            confidence: out.confidence,
            method: METHOD_MULTI.to_string(),
            recommendations: recommend::recommendation_text(count, kind),
            image_size: [w, h],
            tier: self.config.tier,
            stats: out.stats,
            error: None,
        }
    }

    /// Learn a correction factor from a reference photo with a known count.
    ///
    /// Returns the factor now in effect for the category; degenerate inputs
    /// (undecodable bytes, zero expected count, zero raw detections) leave
    /// the stored factor unchanged.
    pub fn calibrate_bytes(&self, bytes: &[u8], expected: u32, fruit: &str) -> f64 {
        let kind = FruitKind::parse_lossy(fruit);
        match decode_rgb(bytes) {
            Ok(img) => self.calibrate_image(&img, expected, kind),
            Err(err) => {
                tracing::warn!(fruit = kind.name(), "calibration skipped: {err}");
                self.calibration.factor(kind)
            }
        }
    }

    /// Learn a correction factor from an already decoded reference image.
    pub fn calibrate_image(&self, img: &RgbImage, expected: u32, kind: FruitKind) -> f64 {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return self.calibration.factor(kind);
        }
        let raw = pipeline::run(img, kind, &self.config).raw_count;
        let factor = self.calibration.learn(kind, expected, raw);
        tracing::info!(
            fruit = kind.name(),
            expected,
            raw,
            "calibration factor {factor:.3}"
        );
        factor
    }

    /// Current correction factor for a category (1.0 when unlearned).
    pub fn calibration_factor(&self, kind: FruitKind) -> f64 {
        self.calibration.factor(kind)
    }

    /// Forget every learned correction factor.
    pub fn reset_calibration(&self) {
        self.calibration.reset();
    }

    fn failure_report(&self, kind: FruitKind, err: &DetectError) -> DetectionReport {
        let confidence = self.config.confidence.failure_confidence;
        DetectionReport {
            total_count: 0,
            groups: vec![FruitGroup {
                fruit_type: kind,
                count: 0,
                confidence,
                boxes: Vec::new(),
            }],
            confidence,
            method: METHOD_FALLBACK.to_string(),
            recommendations: recommend::FAILURE_ADVICE.to_string(),
            image_size: [0, 0],
            tier: self.config.tier,
            stats: None,
            error: Some(format!("{}: {err}", Stage::Ingest)),
        }
    }
}

/// Decode image bytes into RGB, rejecting zero-pixel images.
fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, DetectError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| DetectError::DecodeFailure(e.to_string()))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(DetectError::EmptyImage);
    }
    Ok(img)
}
