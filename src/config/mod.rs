//! Configuration module for samplescope

mod settings;

pub use settings::{AnalysisConfig, ConfigBuilder, MethodId};
