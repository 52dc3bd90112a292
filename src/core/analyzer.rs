// src/core/analyzer.rs
//
// High-level sample analysis API with builder pattern.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info};

use crate::config::{AnalysisConfig, MethodId};
use crate::detection::AnalysisResult;
use super::analysis::{category, key, sample_type, tempo};
use super::capability::CapabilityProfile;
use super::confidence;
use super::decoder::{self, Waveform};
use super::features::{self, SignalContext};

/// Builder for SampleAnalyzer configuration
pub struct AnalyzerBuilder {
    config: AnalysisConfig,
    profile: Option<Arc<CapabilityProfile>>,
    force_safe_mode: bool,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            profile: None,
            force_safe_mode: false,
        }
    }

    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an already detected profile instead of probing the host again
    pub fn profile(mut self, profile: Arc<CapabilityProfile>) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn force_safe_mode(mut self, force: bool) -> Self {
        self.force_safe_mode = force;
        self
    }

    pub fn build(self) -> SampleAnalyzer {
        let profile = match self.profile {
            Some(profile) if self.force_safe_mode && !profile.is_safe_mode() => {
                Arc::new(profile.with_mode(super::capability::AnalysisMode::Safe))
            }
            Some(profile) => profile,
            None if self.force_safe_mode => Arc::new(CapabilityProfile::detect_with(true)),
            None => Arc::new(CapabilityProfile::detect()),
        };
        SampleAnalyzer {
            config: self.config,
            profile,
        }
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies audio samples. Cheap to share across threads; every call is
/// independent.
pub struct SampleAnalyzer {
    config: AnalysisConfig,
    profile: Arc<CapabilityProfile>,
}

impl SampleAnalyzer {
    /// Analyzer with the default configuration and a freshly detected profile
    pub fn new() -> Self {
        AnalyzerBuilder::new().build()
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn with_profile(config: AnalysisConfig, profile: Arc<CapabilityProfile>) -> Self {
        Self { config, profile }
    }

    pub fn profile(&self) -> &Arc<CapabilityProfile> {
        &self.profile
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one file.
    ///
    /// Never fails: a file that cannot be read or decoded yields a result
    /// with `error` set and confidence 0.
    pub fn analyze<P: AsRef<Path>>(&self, path: P) -> AnalysisResult {
        let path = path.as_ref();
        let label = path.to_string_lossy().into_owned();

        match decoder::load(path, &self.profile, &self.config) {
            Ok(waveform) => self.analyze_waveform(&label, &waveform),
            Err(e) => {
                error!("{}", e);
                AnalysisResult::failed(label, e, &self.profile)
            }
        }
    }

    /// Analyze an already decoded waveform; `label` stands in for the file
    /// path in the result and in filename matching
    pub fn analyze_waveform(&self, label: &str, waveform: &Waveform) -> AnalysisResult {
        let profile = self.profile.as_ref();
        debug!(
            "Analyzing {} ({:.2}s at {} Hz, {} mode)",
            label,
            waveform.duration_secs(),
            waveform.sample_rate(),
            profile.mode
        );

        let ctx = SignalContext::new(waveform, &self.config, profile);
        let characteristics = features::extract(&ctx, profile);

        let sample_type = sample_type::classify(&ctx, profile);
        let category = category::classify(label, &ctx, &characteristics, profile);
        let tempo = tempo::estimate(&ctx, profile);
        let key = key::estimate(&ctx, &characteristics, profile);

        let mut methods_used: BTreeSet<String> = BTreeSet::new();
        methods_used.insert(waveform.decoder().name().to_string());
        let voters = sample_type
            .voters
            .iter()
            .chain(&category.voters)
            .chain(&tempo.voters)
            .chain(&key.voters);
        methods_used.extend(voters.map(MethodId::to_string));

        let duration = waveform.duration_secs();
        let confidence = confidence::aggregate(sample_type.winner, category.winner, profile.mode, duration);

        info!(
            "{}: {} {} {:.1} BPM {} ({:.0}%)",
            label,
            sample_type.winner,
            category.winner,
            tempo.winner,
            key.winner,
            confidence * 100.0
        );

        AnalysisResult {
            file_path: label.to_string(),
            duration,
            sample_rate: waveform.sample_rate(),
            sample_type: sample_type.winner,
            category: category.winner,
            bpm: tempo.winner,
            key: key.winner,
            characteristics,
            confidence,
            methods_used,
            cpu_vendor: profile.vendor,
            mode: profile.mode,
            error: None,
        }
    }
}

impl Default for SampleAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
