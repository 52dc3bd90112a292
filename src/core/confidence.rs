// src/core/confidence.rs
//
// Overall confidence score

use serde::{Deserialize, Serialize};

use super::capability::AnalysisMode;
use crate::detection::{Category, SampleType};

/// Clips longer than this score the higher duration factor
pub const MIN_CONFIDENT_DURATION_SECS: f64 = 0.5;

/// The four factors averaged into the final confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub sample_type: f32,
    pub category: f32,
    pub mode: f32,
    pub duration: f32,
}

impl ConfidenceBreakdown {
    pub fn new(sample_type: SampleType, category: Category, mode: AnalysisMode, duration_secs: f64) -> Self {
        Self {
            sample_type: if sample_type.is_known() { 0.8 } else { 0.3 },
            category: if category.is_known() { 0.9 } else { 0.4 },
            mode: match mode {
                AnalysisMode::Advanced => 0.9,
                AnalysisMode::Safe => 0.7,
            },
            duration: if duration_secs > MIN_CONFIDENT_DURATION_SECS { 0.8 } else { 0.6 },
        }
    }

    /// Mean of the factors, clamped to [0, 1]
    pub fn score(&self) -> f32 {
        let sum = self.sample_type + self.category + self.mode + self.duration;
        (sum / 4.0).clamp(0.0, 1.0)
    }
}

/// Confidence for a finished classification
pub fn aggregate(sample_type: SampleType, category: Category, mode: AnalysisMode, duration_secs: f64) -> f32 {
    ConfidenceBreakdown::new(sample_type, category, mode, duration_secs).score()
}
