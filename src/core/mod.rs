//! Core analysis pipeline and DSP utilities

pub mod analysis;
pub mod analyzer;
pub mod capability;
pub mod confidence;
pub mod decoder;
pub mod dsp;
pub mod features;
pub mod voting;

pub use analyzer::{AnalyzerBuilder, SampleAnalyzer};
pub use capability::{AnalysisMode, Capability, CapabilityProfile, CpuVendor};
pub use confidence::ConfidenceBreakdown;
pub use decoder::{DecoderKind, Waveform};
pub use features::{AdvancedFeatures, FeatureSet};
pub use voting::{Ballot, TieBreak, VoteResult};
