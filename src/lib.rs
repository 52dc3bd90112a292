//! samplescope - Classify audio samples for a sample library
//!
//! Analyzes short audio files and reports whether each is a one-shot or a
//! loop, its category, tempo and musical key, with an overall confidence.
//!
//! ## Features
//!
//! - **Ensemble voting**: every decision is made by several independent
//!   estimators; a failing or panicking estimator only loses its vote
//! - **Capability detection**: the host CPU and optional libraries are probed
//!   once; Advanced mode adds STFT-based estimators, Safe mode sticks to
//!   scalar kernels
//! - **Graceful ingestion**: symphonia with band-limited resampling when
//!   available, a plain WAV reader otherwise
//!
//! ## Module Structure
//!
//! - `core` - Ingestion, features, ensembles and the analyzer
//! - `cli` - Command-line interface
//! - `config` - Tunable constants and method switches
//! - `detection` - Result types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use samplescope::SampleAnalyzer;
//!
//! let analyzer = SampleAnalyzer::new();
//! let result = analyzer.analyze("kick_01.wav");
//!
//! println!("{} {} {:.1} BPM {}", result.sample_type, result.category, result.bpm, result.key);
//! ```
//!
//! ## Optional libraries
//!
//! | Feature           | Provides                                   |
//! |-------------------|--------------------------------------------|
//! | `primary-decoder` | symphonia decoding, rubato resampling      |
//! | `tempo-toolkit`   | streaming onset and tempo estimators       |
//! | `ml-toolkit`      | probed and reported only                   |
//!
//! Set `SAMPLESCOPE_SAFE_MODE=1` to force Safe mode.

// Core analysis functionality
pub mod core;

// Command-line interface
pub mod cli;

// Configuration
pub mod config;

// Result types
pub mod detection;

pub mod error;

// Synthetic signals for tests and demos
pub mod testgen;

pub use config::{AnalysisConfig, ConfigBuilder, MethodId};
pub use detection::{AnalysisResult, Category, ConfidenceTier, SampleType, UNKNOWN_KEY};
pub use error::{Abstained, AnalysisError};
pub use core::{
    AnalysisMode, AnalyzerBuilder, Capability, CapabilityProfile, CpuVendor,
    FeatureSet, SampleAnalyzer, Waveform,
};
