#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use samplescope::testgen;
use samplescope::{AnalysisConfig, AnalysisMode, AnalysisResult, CapabilityProfile, SampleAnalyzer};

pub const SR: u32 = 22050;

/// Samples per beat of the reference pulse train (about 117.45 BPM)
pub const PULSE_PERIOD: usize = 22 * 512;

pub fn reference_bpm() -> f32 {
    60.0 * SR as f32 / PULSE_PERIOD as f32
}

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_samplescope"))
}

/// CLI invocation pinned to Safe mode so results do not depend on the host CPU
pub fn run_samplescope() -> Command {
    let mut cmd = Command::new(get_binary_path());
    cmd.env("SAMPLESCOPE_SAFE_MODE", "1");
    cmd
}

pub fn safe_analyzer() -> SampleAnalyzer {
    SampleAnalyzer::with_profile(AnalysisConfig::default(), Arc::new(CapabilityProfile::safe()))
}

/// Advanced mode regardless of the host, with Safe-probed availability
pub fn advanced_analyzer() -> SampleAnalyzer {
    let profile = CapabilityProfile::safe().with_mode(AnalysisMode::Advanced);
    SampleAnalyzer::with_profile(AnalysisConfig::default(), Arc::new(profile))
}

/// Write a mono fixture at the reference rate
pub fn write_fixture(dir: &Path, name: &str, samples: &[f32]) -> PathBuf {
    let path = dir.join(name);
    testgen::write_wav(&path, samples, SR, 1).expect("write fixture");
    path
}

/// A spread of synthetic material for property checks
pub fn corpus() -> Vec<(&'static str, Vec<f32>)> {
    vec![
        ("silence", testgen::silence(1.0, SR)),
        ("tone-a440", testgen::sine(440.0, 2.0, SR, 0.5)),
        ("tone-55", testgen::sine(55.0, 1.0, SR, 0.8)),
        ("hit", testgen::decaying_hit(180.0, 0.8, SR, 0.12)),
        ("noise", testgen::noise(1.5, SR, 0.4, 42)),
        ("pulses", testgen::pulse_train(PULSE_PERIOD, 256, 4.0, SR, 0.9)),
        ("blip", testgen::sine(1000.0, 0.05, SR, 0.5)),
    ]
}

pub fn assert_bounds(result: &AnalysisResult) {
    assert!(
        (0.0..=1.0).contains(&result.confidence),
        "{}: confidence {}",
        result.file_path,
        result.confidence
    );
    assert!(
        result.bpm == 0.0 || (60.0..=200.0).contains(&result.bpm),
        "{}: bpm {}",
        result.file_path,
        result.bpm
    );
}
