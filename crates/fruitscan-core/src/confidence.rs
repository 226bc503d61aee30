//! Detection confidence scoring.

use crate::merge::MergedDetection;

/// Weights and caps for [`score_confidence`].
///
/// The defaults encode how much each signal is allowed to move the score;
/// the tier contributes the starting point.
#[derive(Debug, Clone)]
pub struct ConfidenceConfig {
    /// Weight of the detection-count term.
    pub count_weight: f64,
    /// Detection count at which the count term saturates.
    pub count_saturation: u32,
    /// Relative deviation from the expected area that still counts as a
    /// size match.
    pub size_tolerance: f64,
    /// Contribution of each size-matching detection.
    pub size_bonus: f64,
    /// Cap on the total size term.
    pub size_cap: f64,
    /// Bonus when detections are well spread over the image.
    pub spread_bonus: f64,
    /// Spread threshold as a fraction of sqrt(image area).
    pub spread_frac: f64,
    /// Hard ceiling of the score.
    pub max_confidence: f64,
    /// Fixed score when nothing was detected.
    pub empty_confidence: f64,
    /// Fixed score for the recovered-failure report.
    pub failure_confidence: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            count_weight: 0.3,
            count_saturation: 10,
            size_tolerance: 0.5,
            size_bonus: 0.1,
            size_cap: 0.3,
            spread_bonus: 0.2,
            spread_frac: 0.05,
            max_confidence: 0.95,
            empty_confidence: 0.3,
            failure_confidence: 0.1,
        }
    }
}

/// Score one detection set.
///
/// Composed additively from the tier's base:
/// 1. count term: saturating fraction of `count_saturation` detections;
/// 2. size term: reward detections whose box area is near the expected
///    single-fruit area, averaged over the set;
/// 3. spread term: flat bonus when mean pairwise center distance exceeds
///    `spread_frac * sqrt(image_area)`, since clustered boxes often mean
///    one fruit was cut apart.
///
/// An empty set short-circuits to `empty_confidence`.
pub fn score_confidence(
    detections: &[MergedDetection],
    expected_area: f64,
    image_area: f64,
    base: f64,
    config: &ConfidenceConfig,
) -> f64 {
    if detections.is_empty() {
        return config.empty_confidence;
    }
    let n = detections.len() as f64;

    let count_term =
        (n / config.count_saturation.max(1) as f64).min(1.0) * config.count_weight;

    let mut size_term = 0.0;
    if expected_area > 0.0 {
        let matches = detections
            .iter()
            .filter(|d| ((d.area as f64 - expected_area).abs() / expected_area) < config.size_tolerance)
            .count();
        size_term = (matches as f64 * config.size_bonus / n).min(config.size_cap);
    }

    let mut spread_term = 0.0;
    if detections.len() > 1 && mean_pairwise_distance(detections) > config.spread_frac * image_area.sqrt() {
        spread_term = config.spread_bonus;
    }

    (base + count_term + size_term + spread_term).min(config.max_confidence)
}

fn mean_pairwise_distance(detections: &[MergedDetection]) -> f64 {
    let mut total = 0.0f64;
    let mut pairs = 0u32;
    for i in 0..detections.len() {
        let (xi, yi) = detections[i].center();
        for j in (i + 1)..detections.len() {
            let (xj, yj) = detections[j].center();
            total += (((xi - xj) as f64).powi(2) + ((yi - yj) as f64).powi(2)).sqrt();
            pairs += 1;
        }
    }
    total / pairs as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, side: f32) -> MergedDetection {
        MergedDetection {
            x,
            y,
            width: side,
            height: side,
            area: side * side,
            support: 1,
        }
    }

    #[test]
    fn empty_set_scores_the_fixed_floor() {
        let cfg = ConfidenceConfig::default();
        let score = score_confidence(&[], 3000.0, 800.0 * 600.0, 0.7, &cfg);
        assert_eq!(score, cfg.empty_confidence);
    }

    #[test]
    fn many_spread_size_matched_detections_hit_the_ceiling() {
        let cfg = ConfidenceConfig::default();
        // 14 boxes of area 3600 on an 800x600 canvas, far apart.
        let dets: Vec<MergedDetection> = (0..14)
            .map(|i| det(60.0 * (i % 7) as f32 + 30.0, 250.0 * (i / 7) as f32 + 30.0, 60.0))
            .collect();
        let score = score_confidence(&dets, 3000.0, 800.0 * 600.0, 0.7, &cfg);
        // base 0.7 + count 0.3 + size 0.1 + spread 0.2, capped.
        assert_eq!(score, cfg.max_confidence);
    }

    #[test]
    fn single_small_detection_scores_modestly() {
        let cfg = ConfidenceConfig::default();
        let dets = [det(10.0, 10.0, 20.0)];
        let score = score_confidence(&dets, 3000.0, 800.0 * 600.0, 0.5, &cfg);
        // base 0.5 + count 0.1 * 0.3 = 0.53; no size match (400 vs 3000),
        // no spread with a single box.
        assert!((score - 0.53).abs() < 1e-9, "score = {score}");
    }

    #[test]
    fn size_term_averages_over_the_set() {
        let cfg = ConfidenceConfig::default();
        // One matching area, one far off, well separated.
        let dets = [det(0.0, 0.0, 55.0), det(500.0, 400.0, 10.0)];
        let score = score_confidence(&dets, 3000.0, 800.0 * 600.0, 0.5, &cfg);
        // count: 2/10 * 0.3 = 0.06; size: 1 * 0.1 / 2 = 0.05; spread: 0.2.
        assert!((score - (0.5 + 0.06 + 0.05 + 0.2)).abs() < 1e-9, "score = {score}");
    }

    #[test]
    fn clustered_detections_earn_no_spread_bonus() {
        let cfg = ConfidenceConfig::default();
        let dets = [det(100.0, 100.0, 30.0), det(110.0, 104.0, 30.0)];
        let score = score_confidence(&dets, 900.0, 800.0 * 600.0, 0.7, &cfg);
        // Mean pairwise distance ~10.8 < 0.05 * sqrt(480000) ~ 34.6.
        // count 0.06, size 0.1 (both match 900), no spread.
        assert!((score - (0.7 + 0.06 + 0.1)).abs() < 1e-9, "score = {score}");
    }

    #[test]
    fn score_never_exceeds_the_ceiling() {
        let cfg = ConfidenceConfig::default();
        let dets: Vec<MergedDetection> = (0..50)
            .map(|i| det((i * 97 % 700) as f32, (i * 53 % 500) as f32, 55.0))
            .collect();
        let score = score_confidence(&dets, 3000.0, 800.0 * 600.0, 0.8, &cfg);
        assert!(score <= cfg.max_confidence);
        assert!(score >= 0.0 && score <= 1.0);
    }
}
