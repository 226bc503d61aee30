//! Accuracy tiers and the capabilities they unlock.

use serde::{Deserialize, Serialize};

/// Requested accuracy/effort level for a detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    /// Fastest: HSV segmentation and contour analysis only.
    Low,
    /// Adds Lab segmentation, circle voting, denoising and the rescue pass.
    Medium,
    /// Everything in medium plus saturation boost, stricter circle votes
    /// and per-run debug statistics.
    High,
}

impl Default for AccuracyTier {
    fn default() -> Self {
        AccuracyTier::Medium
    }
}

impl AccuracyTier {
    pub fn name(self) -> &'static str {
        match self {
            AccuracyTier::Low => "low",
            AccuracyTier::Medium => "medium",
            AccuracyTier::High => "high",
        }
    }

    pub fn policy(self) -> TierPolicy {
        TierPolicy::for_tier(self)
    }
}

impl std::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a tier enables.
///
/// Stage code consults this record instead of matching on [`AccuracyTier`],
/// so the capability of each tier is declared in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierPolicy {
    /// Starting point for confidence scoring.
    pub base_confidence: f64,
    /// Structuring-element radius for mask open/close (1 = 3x3, 2 = 5x5).
    pub morph_radius: u8,
    /// Consult the profile's Lab ranges in addition to HSV.
    pub use_lab: bool,
    /// Run the gradient-voting circle detector.
    pub use_circles: bool,
    /// Discard mask components below half the profile's minimum area.
    pub prefilter_components: bool,
    /// Boost saturation/value before segmentation.
    pub boost_saturation: bool,
    /// Gaussian-denoise the image before segmentation.
    pub denoise: bool,
    /// Multiplier on the circle vote threshold (> 1.0 accepts fewer circles).
    pub vote_scale: f32,
    /// Run the adaptive-threshold rescue pass when nothing is found.
    pub rescue_pass: bool,
    /// Attach per-stage statistics to the report.
    pub include_stats: bool,
}

impl TierPolicy {
    pub fn for_tier(tier: AccuracyTier) -> Self {
        match tier {
            AccuracyTier::Low => Self {
                base_confidence: 0.5,
                morph_radius: 1,
                use_lab: false,
                use_circles: false,
                prefilter_components: false,
                boost_saturation: false,
                denoise: false,
                vote_scale: 1.0,
                rescue_pass: false,
                include_stats: false,
            },
            AccuracyTier::Medium => Self {
                base_confidence: 0.7,
                morph_radius: 2,
                use_lab: true,
                use_circles: true,
                prefilter_components: true,
                boost_saturation: false,
                denoise: true,
                vote_scale: 1.0,
                rescue_pass: true,
                include_stats: false,
            },
            AccuracyTier::High => Self {
                base_confidence: 0.8,
                morph_radius: 2,
                use_lab: true,
                use_circles: true,
                prefilter_components: true,
                boost_saturation: true,
                denoise: true,
                vote_scale: 1.2,
                rescue_pass: true,
                include_stats: true,
            },
        }
    }
}
