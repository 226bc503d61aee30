//! Reconciliation of overlapping candidates from multiple detectors.
//!
//! The circle voter and the contour analyzer usually both fire on the same
//! fruit. Candidates are clustered by center proximity; each cluster's box
//! is the running average of its members, and later candidates are measured
//! against that moving average. In dense scenes the average can
//! drift and absorb a neighbor; that chaining is accepted behavior, bounded
//! in practice by the non-maximum suppression upstream.

use crate::CandidateRegion;

/// Controls candidate clustering.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// A candidate joins a cluster when its center is within this fraction
    /// of the largest dimension of either box, cluster or candidate.
    pub center_gap_factor: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            center_gap_factor: 0.7,
        }
    }
}

/// One reconciled detection.
#[derive(Debug, Clone, Copy)]
pub struct MergedDetection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Box area, width * height.
    pub area: f32,
    /// Number of raw candidates absorbed.
    pub support: u32,
}

impl MergedDetection {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Cluster candidates in discovery order.
///
/// Each unclaimed candidate seeds a cluster, then absorbs every later
/// unclaimed candidate whose center lies within `center_gap_factor` times
/// the largest dimension of the two boxes (running cluster and candidate),
/// measured from the cluster's current running-average center. The cluster
/// box is the incremental mean of its members.
pub fn merge_candidates(candidates: &[CandidateRegion], config: &MergeConfig) -> Vec<MergedDetection> {
    let mut used = vec![false; candidates.len()];
    let mut merged = Vec::new();

    for i in 0..candidates.len() {
        if used[i] {
            continue;
        }
        used[i] = true;

        let c = &candidates[i];
        let mut acc = MergedDetection {
            x: c.x as f32,
            y: c.y as f32,
            width: c.width as f32,
            height: c.height as f32,
            area: 0.0,
            support: 1,
        };

        for j in (i + 1)..candidates.len() {
            if used[j] {
                continue;
            }
            let cj = &candidates[j];
            let (acx, acy) = acc.center();
            let (jcx, jcy) = cj.center();
            let dist = ((jcx - acx).powi(2) + (jcy - acy).powi(2)).sqrt();
            let max_dim = acc
                .width
                .max(acc.height)
                .max(cj.width as f32)
                .max(cj.height as f32);
            if dist >= config.center_gap_factor * max_dim {
                continue;
            }

            let n = acc.support as f32;
            acc.x = (acc.x * n + cj.x as f32) / (n + 1.0);
            acc.y = (acc.y * n + cj.y as f32) / (n + 1.0);
            acc.width = (acc.width * n + cj.width as f32) / (n + 1.0);
            acc.height = (acc.height * n + cj.height as f32) / (n + 1.0);
            acc.support += 1;
            used[j] = true;
        }

        acc.area = acc.width * acc.height;
        merged.push(acc);
    }
    merged
}
