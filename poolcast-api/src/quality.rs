//! Quality score classification
//!
//! Maps the server-computed quality proxy (`[-1, 100]`, `-1` unknown) to a
//! display tier. Pure; no failure modes.

use serde::Serialize;

/// Display tier for a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityTier {
    Unknown,
    Poor,
    Medium,
    Good,
}

impl QualityTier {
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Unknown => "unknown",
            QualityTier::Poor => "poor",
            QualityTier::Medium => "medium",
            QualityTier::Good => "good",
        }
    }
}

/// Classify a quality score.
///
/// `-1` is the server's "unknown" sentinel; `20..=80` is the medium band,
/// inclusive on both ends.
pub fn tier(score: i32) -> QualityTier {
    if score == -1 {
        QualityTier::Unknown
    } else if score < 20 {
        QualityTier::Poor
    } else if score <= 80 {
        QualityTier::Medium
    } else {
        QualityTier::Good
    }
}
