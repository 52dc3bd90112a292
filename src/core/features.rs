// src/core/features.rs
//
// Shared signal statistics. A `SignalContext` computes the frame envelope and
// whole-signal spectrum once per waveform; the STFT and onset envelope are
// built on first use and shared by every estimator that asks for them.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use super::analysis::mfcc::{mfcc_means, MfccParams};
use super::analysis::spectral;
use super::capability::{Capability, CapabilityProfile};
use super::decoder::Waveform;
use super::dsp::{full_magnitude_spectrum, stats, FftProcessor, Planner, WindowType};

/// Three-band split used by the frequency-band classifier
pub const BANDS: [&str; 3] = ["bass", "mid", "high"];
/// Five-band split used by the category fallback
pub const FALLBACK_BANDS: [&str; 5] = ["sub_bass", "bass", "low_mid", "mid", "high"];

const FALLBACK_EDGES_HZ: [f32; 4] = [100.0, 300.0, 1000.0, 4000.0];

/// STFT-derived descriptors, present only in Advanced mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedFeatures {
    pub centroid_mean: f32,
    pub rolloff_mean: f32,
    pub bandwidth_mean: f32,
    pub onset_strength_mean: f32,
    pub mfcc_mean: Vec<f32>,
}

/// Low-level statistics of one waveform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub rms_mean: f32,
    pub rms_std: f32,
    pub zero_crossing_rate: f32,
    pub spectral_centroid: f32,
    pub spectral_rolloff: f32,
    pub spectral_bandwidth: f32,
    pub dominant_frequency: f32,
    /// Magnitude sums per band of `BANDS`
    pub band_energies: BTreeMap<String, f32>,
    /// Magnitude sums per band of `FALLBACK_BANDS`
    pub fallback_band_energies: BTreeMap<String, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced: Option<AdvancedFeatures>,
}

impl FeatureSet {
    /// Share of the three-band total in `band`, 0 when the total is 0
    pub fn band_ratio(&self, band: &str) -> f32 {
        ratio(&self.band_energies, band)
    }

    /// Share of the five-band total in `band`, 0 when the total is 0
    pub fn fallback_ratio(&self, band: &str) -> f32 {
        ratio(&self.fallback_band_energies, band)
    }

    pub fn total_band_energy(&self) -> f32 {
        self.band_energies.values().sum()
    }
}

fn ratio(bands: &BTreeMap<String, f32>, band: &str) -> f32 {
    let total: f32 = bands.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    bands.get(band).copied().unwrap_or(0.0) / total
}

/// Per-waveform cache of intermediate signal representations
pub struct SignalContext<'a> {
    waveform: &'a Waveform,
    config: &'a AnalysisConfig,
    allow_simd: bool,
    frame_energies: Vec<f32>,
    frame_rms: Vec<f32>,
    spectrum: Vec<f32>,
    stft: OnceCell<Vec<Vec<f32>>>,
    onset_envelope: OnceCell<Vec<f32>>,
}

impl<'a> SignalContext<'a> {
    pub fn new(waveform: &'a Waveform, config: &'a AnalysisConfig, profile: &CapabilityProfile) -> Self {
        let allow_simd = profile.use_simd_fft();
        let samples = waveform.samples();
        let hop = config.hop_length;

        let mut planner = Planner::new(allow_simd);
        let spectrum = full_magnitude_spectrum(&mut planner, samples);

        Self {
            waveform,
            config,
            allow_simd,
            frame_energies: stats::frame_energies(samples, hop),
            frame_rms: stats::frame_rms(samples, hop),
            spectrum,
            stft: OnceCell::new(),
            onset_envelope: OnceCell::new(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        self.waveform.samples()
    }

    pub fn sample_rate(&self) -> u32 {
        self.waveform.sample_rate()
    }

    pub fn duration_secs(&self) -> f64 {
        self.waveform.duration_secs()
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    pub fn allow_simd(&self) -> bool {
        self.allow_simd
    }

    /// Sum of squares per hop-length frame
    pub fn frame_energies(&self) -> &[f32] {
        &self.frame_energies
    }

    /// RMS per hop-length frame
    pub fn frame_rms(&self) -> &[f32] {
        &self.frame_rms
    }

    /// Whole-signal magnitude spectrum (positive frequencies)
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    /// Frequency of a bin of [`Self::spectrum`]
    pub fn spectrum_frequency(&self, bin: usize) -> f32 {
        super::dsp::bin_frequency(bin, self.samples().len(), self.sample_rate())
    }

    pub fn has_energy(&self) -> bool {
        self.samples().iter().any(|&s| s != 0.0)
    }

    /// Hann-windowed STFT magnitudes, computed on first use
    pub fn stft(&self) -> &[Vec<f32>] {
        self.stft.get_or_init(|| {
            debug!(
                "Computing STFT ({} / {}) for {} samples",
                self.config.stft_size,
                self.config.stft_hop,
                self.samples().len()
            );
            let mut processor = FftProcessor::new(self.config.stft_size, WindowType::Hann, self.allow_simd);
            processor.stft(self.samples(), self.config.stft_hop)
        })
    }

    pub fn stft_frequencies(&self) -> Vec<f32> {
        spectral::stft_frequencies(self.config.stft_size, self.sample_rate())
    }

    /// Spectral-flux onset strength, computed on first use
    pub fn onset_envelope(&self) -> &[f32] {
        self.onset_envelope
            .get_or_init(|| spectral::onset_strength(self.stft()))
    }

    /// Frames per second of the STFT and onset envelope
    pub fn onset_frame_rate(&self) -> f32 {
        self.sample_rate() as f32 / self.config.stft_hop.max(1) as f32
    }
}

/// Compute the shared feature set
pub fn extract(ctx: &SignalContext<'_>, profile: &CapabilityProfile) -> FeatureSet {
    let config = ctx.config();
    let spectrum = ctx.spectrum();
    let freqs: Vec<f32> = (0..spectrum.len()).map(|k| ctx.spectrum_frequency(k)).collect();

    let mut band_energies: BTreeMap<String, f32> =
        BANDS.iter().map(|b| (b.to_string(), 0.0)).collect();
    let mut fallback_band_energies: BTreeMap<String, f32> =
        FALLBACK_BANDS.iter().map(|b| (b.to_string(), 0.0)).collect();

    for (&m, &f) in spectrum.iter().zip(&freqs) {
        let band = if f < config.bass_cutoff_hz {
            BANDS[0]
        } else if f < config.high_cutoff_hz {
            BANDS[1]
        } else {
            BANDS[2]
        };
        *band_energies.entry(band.to_string()).or_insert(0.0) += m;

        let idx = FALLBACK_EDGES_HZ.iter().position(|&edge| f < edge).unwrap_or(4);
        *fallback_band_energies
            .entry(FALLBACK_BANDS[idx].to_string())
            .or_insert(0.0) += m;
    }

    let dominant_frequency = spectrum
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (k, &m)| match best {
            Some((_, bm)) if bm >= m => best,
            _ => Some((k, m)),
        })
        .filter(|&(_, m)| m > 0.0)
        .map(|(k, _)| freqs[k])
        .unwrap_or(0.0);

    let rms = ctx.frame_rms();

    let advanced = if profile.allows(Capability::AdvancedSpectral) {
        match catch_unwind(AssertUnwindSafe(|| extract_advanced(ctx))) {
            Ok(features) => Some(features),
            Err(_) => {
                warn!("Advanced spectral feature extraction panicked; continuing without it");
                None
            }
        }
    } else {
        None
    };

    FeatureSet {
        rms_mean: stats::mean(rms),
        rms_std: stats::std_dev(rms),
        zero_crossing_rate: stats::zero_crossing_rate(ctx.samples()),
        spectral_centroid: stats::spectral_centroid(spectrum, &freqs),
        spectral_rolloff: stats::spectral_rolloff(spectrum, &freqs, config.rolloff_percent),
        spectral_bandwidth: stats::spectral_spread(spectrum, &freqs),
        dominant_frequency,
        band_energies,
        fallback_band_energies,
        advanced,
    }
}

fn extract_advanced(ctx: &SignalContext<'_>) -> AdvancedFeatures {
    let config = ctx.config();
    let freqs = ctx.stft_frequencies();
    let stft = ctx.stft();
    let shape = spectral::frame_shape(stft, &freqs, config.rolloff_percent);

    let params = MfccParams {
        num_coefficients: config.mfcc_coefficients,
        num_mel_bands: config.mel_bands,
    };

    AdvancedFeatures {
        centroid_mean: shape.centroid,
        rolloff_mean: shape.rolloff,
        bandwidth_mean: shape.bandwidth,
        onset_strength_mean: stats::mean(ctx.onset_envelope()),
        mfcc_mean: mfcc_means(stft, &freqs, ctx.sample_rate(), &params),
    }
}
