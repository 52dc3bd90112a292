// src/config/settings.rs
//
// Tunable constants for the classification ensembles

use std::collections::HashSet;
use serde::{Deserialize, Serialize};

/// Individual estimators that can cast a vote in one of the ensembles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodId {
    // Sample type
    EnergyFade,
    OnsetDensity,
    SpectralOnsets,
    ToolkitOnsets,
    // Category
    FilenameKeywords,
    FrequencyBands,
    SpectralFeatures,
    BandFallback,
    // Tempo
    EnergyAutocorrelation,
    SpectralBeatTracker,
    ToolkitTempo,
    // Key
    DominantFrequency,
    ChromaProfile,
}

impl MethodId {
    pub fn all() -> Vec<Self> {
        vec![
            Self::EnergyFade,
            Self::OnsetDensity,
            Self::SpectralOnsets,
            Self::ToolkitOnsets,
            Self::FilenameKeywords,
            Self::FrequencyBands,
            Self::SpectralFeatures,
            Self::BandFallback,
            Self::EnergyAutocorrelation,
            Self::SpectralBeatTracker,
            Self::ToolkitTempo,
            Self::DominantFrequency,
            Self::ChromaProfile,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EnergyFade => "energy-fade",
            Self::OnsetDensity => "onset-density",
            Self::SpectralOnsets => "spectral-onsets",
            Self::ToolkitOnsets => "toolkit-onsets",
            Self::FilenameKeywords => "filename-keywords",
            Self::FrequencyBands => "frequency-bands",
            Self::SpectralFeatures => "spectral-features",
            Self::BandFallback => "band-fallback",
            Self::EnergyAutocorrelation => "energy-autocorrelation",
            Self::SpectralBeatTracker => "spectral-beat-tracker",
            Self::ToolkitTempo => "toolkit-tempo",
            Self::DominantFrequency => "dominant-frequency",
            Self::ChromaProfile => "chroma-profile",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|m| m.name() == name)
    }
}

impl std::fmt::Display for MethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate every waveform is brought to (Hz)
    pub target_sample_rate: u32,
    /// Frame size for the energy envelope (samples)
    pub hop_length: usize,

    /// Share of frames compared at each end by the energy-fade method
    pub fade_portion: f32,
    /// End/start energy ratio below which a clip counts as decaying
    pub fade_ratio: f32,
    /// Standard deviations above the mean an energy jump must reach
    pub onset_std_factor: f32,
    /// Onset count at or below which a clip is a one-shot
    pub max_oneshot_onsets: usize,
    /// Duration splitting one-shots from loops on a tied vote (seconds)
    pub tie_break_duration_secs: f32,

    pub bass_cutoff_hz: f32,
    pub high_cutoff_hz: f32,
    pub bass_ratio_threshold: f32,
    pub high_ratio_threshold: f32,
    pub fallback_mid_ratio_threshold: f32,

    pub min_bpm: f32,
    pub max_bpm: f32,

    /// Minimum key-profile correlation accepted by the chroma method
    pub chroma_threshold: f32,

    pub stft_size: usize,
    pub stft_hop: usize,
    pub rolloff_percent: f32,
    pub mfcc_coefficients: usize,
    pub mel_bands: usize,

    pub toolkit_buffer_size: usize,
    pub toolkit_hop_size: usize,
    pub tempo_chunk_secs: f32,
    pub tempo_chunk_overlap: f32,

    /// Methods excluded from voting regardless of availability
    pub disabled_methods: HashSet<MethodId>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 22050,
            hop_length: 512,
            fade_portion: 0.3,
            fade_ratio: 0.4,
            onset_std_factor: 2.0,
            max_oneshot_onsets: 2,
            tie_break_duration_secs: 2.0,
            bass_cutoff_hz: 250.0,
            high_cutoff_hz: 4000.0,
            bass_ratio_threshold: 0.6,
            high_ratio_threshold: 0.4,
            fallback_mid_ratio_threshold: 0.5,
            min_bpm: 60.0,
            max_bpm: 200.0,
            chroma_threshold: 0.6,
            stft_size: 2048,
            stft_hop: 512,
            rolloff_percent: 0.85,
            mfcc_coefficients: 13,
            mel_bands: 26,
            toolkit_buffer_size: 1024,
            toolkit_hop_size: 512,
            tempo_chunk_secs: 4.0,
            tempo_chunk_overlap: 0.5,
            disabled_methods: HashSet::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn is_method_enabled(&self, method: MethodId) -> bool {
        !self.disabled_methods.contains(&method)
    }

    /// Whether a tempo lies inside the accepted range
    pub fn bpm_in_range(&self, bpm: f32) -> bool {
        bpm >= self.min_bpm && bpm <= self.max_bpm
    }
}

/// Builder for custom configurations
pub struct ConfigBuilder {
    config: AnalysisConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from JSON.
    ///
    /// Every value goes through the same limits the setters apply, so a
    /// hand-written file cannot zero out a rate or frame size.
    pub fn from_config(config: AnalysisConfig) -> Self {
        let (rate, hop, tie, min_bpm, max_bpm, chroma) = (
            config.target_sample_rate,
            config.hop_length,
            config.tie_break_duration_secs,
            config.min_bpm,
            config.max_bpm,
            config.chroma_threshold,
        );
        let mut builder = Self { config }
            .target_sample_rate(rate)
            .hop_length(hop)
            .tie_break_duration(tie)
            .bpm_range(min_bpm, max_bpm)
            .chroma_threshold(chroma);

        let c = &mut builder.config;
        c.fade_portion = finite_or(c.fade_portion, 0.3).clamp(0.05, 0.5);
        c.fade_ratio = finite_or(c.fade_ratio, 0.4).max(0.0);
        c.onset_std_factor = finite_or(c.onset_std_factor, 2.0).max(0.0);
        c.stft_size = c.stft_size.clamp(256, 16384);
        c.stft_hop = c.stft_hop.clamp(32, c.stft_size);
        c.rolloff_percent = finite_or(c.rolloff_percent, 0.85).clamp(0.01, 1.0);
        c.mel_bands = c.mel_bands.clamp(8, 128);
        c.mfcc_coefficients = c.mfcc_coefficients.clamp(1, c.mel_bands);
        c.toolkit_buffer_size = c.toolkit_buffer_size.clamp(256, 8192);
        c.toolkit_hop_size = c.toolkit_hop_size.clamp(32, c.toolkit_buffer_size);
        c.tempo_chunk_secs = finite_or(c.tempo_chunk_secs, 4.0).max(0.5);
        c.tempo_chunk_overlap = finite_or(c.tempo_chunk_overlap, 0.5).clamp(0.0, 0.9);
        builder
    }

    pub fn target_sample_rate(mut self, rate: u32) -> Self {
        self.config.target_sample_rate = rate.clamp(8000, 192_000);
        self
    }

    pub fn hop_length(mut self, hop: usize) -> Self {
        self.config.hop_length = hop.clamp(64, 8192);
        self
    }

    pub fn tie_break_duration(mut self, secs: f32) -> Self {
        self.config.tie_break_duration_secs = finite_or(secs, 2.0).max(0.0);
        self
    }

    pub fn bpm_range(mut self, min: f32, max: f32) -> Self {
        let (min, max) = (finite_or(min, 60.0), finite_or(max, 200.0));
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.config.min_bpm = lo.max(1.0);
        self.config.max_bpm = hi.max(self.config.min_bpm);
        self
    }

    pub fn chroma_threshold(mut self, threshold: f32) -> Self {
        self.config.chroma_threshold = finite_or(threshold, 0.6).clamp(-1.0, 1.0);
        self
    }

    pub fn disable_method(mut self, method: MethodId) -> Self {
        self.config.disabled_methods.insert(method);
        self
    }

    pub fn enable_method(mut self, method: MethodId) -> Self {
        self.config.disabled_methods.remove(&method);
        self
    }

    pub fn build(self) -> AnalysisConfig {
        self.config
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
