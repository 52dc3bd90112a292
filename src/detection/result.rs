//! Classification result types

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::capability::{AnalysisMode, CapabilityProfile, CpuVendor};
use crate::core::features::FeatureSet;

/// Key label reported when no estimator produced a key
pub const UNKNOWN_KEY: &str = "unknown";

/// One-shot vs loop decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    #[serde(rename = "one-shot")]
    OneShot,
    #[serde(rename = "loop")]
    Loop,
    #[serde(rename = "unknown")]
    Unknown,
}

impl SampleType {
    pub fn is_known(&self) -> bool {
        *self != SampleType::Unknown
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SampleType::OneShot => "one-shot",
            SampleType::Loop => "loop",
            SampleType::Unknown => "unknown",
        })
    }
}

/// Instrument/content category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Bass,
    Drums,
    FX,
    Melodic,
    Vocals,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Category {
    pub fn is_known(&self) -> bool {
        *self != Category::Unknown
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Bass => "Bass",
            Category::Drums => "Drums",
            Category::FX => "FX",
            Category::Melodic => "Melodic",
            Category::Vocals => "Vocals",
            Category::Unknown => "unknown",
        })
    }
}

/// Coarse reading of the overall confidence for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn from_confidence(confidence: f32) -> Self {
        match confidence {
            c if c >= 0.8 => ConfidenceTier::High,
            c if c >= 0.6 => ConfidenceTier::Medium,
            _ => ConfidenceTier::Low,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ConfidenceTier::Low => "✗",
            ConfidenceTier::Medium => "⚠",
            ConfidenceTier::High => "✓",
        }
    }
}

/// Complete classification of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_path: String,
    /// Seconds
    pub duration: f64,
    pub sample_rate: u32,
    pub sample_type: SampleType,
    pub category: Category,
    /// 0 when undetermined, otherwise within the configured BPM range
    pub bpm: f32,
    pub key: String,
    pub characteristics: FeatureSet,
    pub confidence: f32,
    pub methods_used: BTreeSet<String>,
    pub cpu_vendor: CpuVendor,
    pub mode: AnalysisMode,
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Result for a file whose ingestion failed
    pub fn failed(file_path: impl Into<String>, error: impl fmt::Display, profile: &CapabilityProfile) -> Self {
        Self {
            file_path: file_path.into(),
            duration: 0.0,
            sample_rate: 0,
            sample_type: SampleType::Unknown,
            category: Category::Unknown,
            bpm: 0.0,
            key: UNKNOWN_KEY.to_string(),
            characteristics: FeatureSet::default(),
            confidence: 0.0,
            methods_used: BTreeSet::new(),
            cpu_vendor: profile.vendor,
            mode: profile.mode,
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn has_tempo(&self) -> bool {
        self.bpm > 0.0
    }

    pub fn confidence_tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_confidence(self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_serialize_as_plain_strings() {
        assert_eq!(serde_json::to_string(&SampleType::OneShot).unwrap(), "\"one-shot\"");
        assert_eq!(serde_json::to_string(&Category::FX).unwrap(), "\"FX\"");
        assert_eq!(serde_json::to_string(&Category::Unknown).unwrap(), "\"unknown\"");
        assert_eq!(Category::Melodic.to_string(), "Melodic");
    }

    #[test]
    fn test_failed_result_shape() {
        let profile = CapabilityProfile::safe();
        let result = AnalysisResult::failed("/x.wav", "cannot read /x.wav", &profile);
        assert!(!result.is_ok());
        assert_eq!(result.sample_type, SampleType::Unknown);
        assert_eq!(result.category, Category::Unknown);
        assert_eq!(result.bpm, 0.0);
        assert_eq!(result.key, UNKNOWN_KEY);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.confidence_tier(), ConfidenceTier::Low);
    }
}
