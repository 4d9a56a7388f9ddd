//! Similarity scoring and replacement detection.
//!
//! Both heuristics degrade gracefully on missing metadata: the
//! similarity score re-normalizes over the signals actually available,
//! and the replacement detector skips any ratio it cannot compute.

use serde::{Deserialize, Serialize};

use crate::catalog::VideoRecord;

/// Similarity above this gates duplicate_detection.
pub const DUPLICATE_SIMILARITY_THRESHOLD: f64 = 0.8;
/// A quality-indicator ratio strictly below this suggests replacement.
pub const REPLACEMENT_RATIO_LOW: f64 = 0.8;
/// A quality-indicator ratio strictly above this suggests replacement.
pub const REPLACEMENT_RATIO_HIGH: f64 = 1.2;

const WEIGHT_SIZE: f64 = 0.3;
const WEIGHT_DURATION: f64 = 0.3;
const WEIGHT_RESOLUTION: f64 = 0.2;
const WEIGHT_CODE: f64 = 0.2;

/// Tunable thresholds for the merge heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeThresholds {
    #[serde(default = "default_duplicate_similarity")]
    pub duplicate_similarity: f64,
    #[serde(default = "default_ratio_low")]
    pub replacement_ratio_low: f64,
    #[serde(default = "default_ratio_high")]
    pub replacement_ratio_high: f64,
}

fn default_duplicate_similarity() -> f64 {
    DUPLICATE_SIMILARITY_THRESHOLD
}

fn default_ratio_low() -> f64 {
    REPLACEMENT_RATIO_LOW
}

fn default_ratio_high() -> f64 {
    REPLACEMENT_RATIO_HIGH
}

impl Default for MergeThresholds {
    fn default() -> Self {
        Self {
            duplicate_similarity: DUPLICATE_SIMILARITY_THRESHOLD,
            replacement_ratio_low: REPLACEMENT_RATIO_LOW,
            replacement_ratio_high: REPLACEMENT_RATIO_HIGH,
        }
    }
}

impl MergeThresholds {
    /// True when `ratio` falls strictly outside [low, high]. A ratio
    /// exactly on either bound does not trigger.
    fn ratio_outside(&self, ratio: f64) -> bool {
        ratio < self.replacement_ratio_low || ratio > self.replacement_ratio_high
    }
}

/// Closeness of two positive quantities as `1 - |a-b| / max(a,b)`.
fn closeness(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max <= 0.0 {
        return 0.0;
    }
    1.0 - (a - b).abs() / max
}

/// Ratio `new / existing`, or None when either side is unavailable.
fn ratio(new: Option<f64>, existing: Option<f64>) -> Option<f64> {
    match (new, existing) {
        (Some(n), Some(e)) if e > 0.0 => Some(n / e),
        _ => None,
    }
}

/// Weighted similarity in [0, 1] between two catalog entries.
///
/// Signals: file size (0.3), duration (0.3), resolution by pixel
/// count (0.2), code equality (0.2). A signal missing on either side
/// drops out and the remaining weights are re-normalized, so two
/// entries with only sizes known can still score 1.0.
pub fn similarity(a: &VideoRecord, b: &VideoRecord) -> f64 {
    let mut score = 0.0;
    let mut total_weight = 0.0;

    if let (Some(sa), Some(sb)) = (a.file_size, b.file_size) {
        if sa > 0 && sb > 0 {
            score += WEIGHT_SIZE * closeness(sa as f64, sb as f64);
            total_weight += WEIGHT_SIZE;
        }
    }
    if let (Some(da), Some(db)) = (a.duration, b.duration) {
        if da > 0.0 && db > 0.0 {
            score += WEIGHT_DURATION * closeness(da, db);
            total_weight += WEIGHT_DURATION;
        }
    }
    if let (Some(ra), Some(rb)) = (a.resolution_pixels(), b.resolution_pixels()) {
        score += WEIGHT_RESOLUTION * closeness(ra as f64, rb as f64);
        total_weight += WEIGHT_RESOLUTION;
    }
    if let (Some(ca), Some(cb)) = (a.video_code.as_deref(), b.video_code.as_deref()) {
        if ca.eq_ignore_ascii_case(cb) {
            score += WEIGHT_CODE;
        }
        total_weight += WEIGHT_CODE;
    }

    if total_weight == 0.0 {
        0.0
    } else {
        score / total_weight
    }
}

/// Judge whether `new` supersedes `existing`.
///
/// Callers must have established that both entries share a code and
/// carry distinct fingerprints; this function only weighs the quality
/// indicators. Any single trigger is enough: a size, resolution, or
/// bitrate ratio strictly outside [low, high], a different video
/// codec, or a different containing directory. The detector leans
/// toward replacement on ambiguity rather than stacking near-copies
/// under one code.
pub fn is_replacement(
    new: &VideoRecord,
    existing: &VideoRecord,
    thresholds: &MergeThresholds,
) -> bool {
    if let Some(r) = ratio(
        new.file_size.map(|s| s as f64),
        existing.file_size.map(|s| s as f64),
    ) {
        if thresholds.ratio_outside(r) {
            return true;
        }
    }

    if let Some(r) = ratio(
        new.resolution_pixels().map(|p| p as f64),
        existing.resolution_pixels().map(|p| p as f64),
    ) {
        if thresholds.ratio_outside(r) {
            return true;
        }
    }

    if let Some(r) = ratio(
        new.bit_rate.map(|b| b as f64),
        existing.bit_rate.map(|b| b as f64),
    ) {
        if thresholds.ratio_outside(r) {
            return true;
        }
    }

    if let (Some(nc), Some(ec)) = (new.video_codec.as_deref(), existing.video_codec.as_deref()) {
        if !nc.eq_ignore_ascii_case(ec) {
            return true;
        }
    }

    if new.directory() != existing.directory() {
        return true;
    }

    false
}
