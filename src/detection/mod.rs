//! Result types for samplescope

mod result;

pub use result::{AnalysisResult, Category, ConfidenceTier, SampleType, UNKNOWN_KEY};
