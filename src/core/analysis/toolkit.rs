// src/core/analysis/toolkit.rs
//
// Streaming onset and tempo toolkit. Buffers are fed one hop at a time; a
// high-frequency-content detection function is peak-picked against an
// adaptive median threshold. Tempo is the median inter-onset interval,
// measured per overlapping chunk and aggregated by median.

use std::collections::VecDeque;

use crate::config::AnalysisConfig;
use crate::core::dsp::{stats, FftProcessor, WindowType};
use crate::error::{Abstained, MethodResult};

const HISTORY_LEN: usize = 7;
const THRESHOLD: f32 = 0.3;
const SILENCE_DB: f32 = -70.0;
const MIN_IOI_SECS: f32 = 0.02;

/// Streaming onset detector
pub struct OnsetTracker {
    processor: FftProcessor,
    hop_size: usize,
    history: VecDeque<f32>,
    prev: f32,
    prev_prev: f32,
    frame: usize,
    min_ioi_frames: usize,
    last_onset: Option<usize>,
}

impl OnsetTracker {
    pub fn new(buffer_size: usize, hop_size: usize, sample_rate: u32, allow_simd: bool) -> MethodResult<Self> {
        if hop_size == 0 || buffer_size < hop_size || sample_rate == 0 {
            return Err(Abstained::failed(format!(
                "invalid tracker geometry: buffer {} hop {} rate {}",
                buffer_size, hop_size, sample_rate
            )));
        }

        let min_ioi_frames = ((MIN_IOI_SECS * sample_rate as f32) / hop_size as f32).ceil() as usize;

        Ok(Self {
            processor: FftProcessor::new(buffer_size, WindowType::Hann, allow_simd),
            hop_size,
            history: VecDeque::with_capacity(HISTORY_LEN),
            prev: 0.0,
            prev_prev: 0.0,
            frame: 0,
            min_ioi_frames: min_ioi_frames.max(1),
            last_onset: None,
        })
    }

    /// Feed one buffer; returns true when an onset was confirmed.
    ///
    /// Peaks are confirmed one buffer late, so the onset belongs to the
    /// previous buffer (see [`Self::last_onset`]).
    pub fn process(&mut self, buffer: &[f32]) -> bool {
        let level = stats::rms(buffer);
        let silent = level < 1e-10 || 20.0 * level.log10() < SILENCE_DB;

        let odf = if silent {
            0.0
        } else {
            let mags = self.processor.magnitude_spectrum(buffer);
            let n = mags.len().max(1) as f32;
            mags.iter()
                .enumerate()
                .map(|(k, m)| k as f32 * m * m)
                .sum::<f32>()
                / n
        };

        let threshold = if self.history.is_empty() {
            0.0
        } else {
            let mut window: Vec<f32> = self.history.iter().copied().collect();
            let mean = stats::mean(&window);
            stats::median(&mut window) + THRESHOLD * mean
        };

        let candidate = self.frame.checked_sub(1);
        let is_peak = self.prev > self.prev_prev && self.prev >= odf && self.prev > threshold;

        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(self.prev);
        self.prev_prev = self.prev;
        self.prev = odf;
        self.frame += 1;

        match candidate {
            Some(onset) if is_peak => {
                let spaced = self
                    .last_onset
                    .map_or(true, |last| onset - last >= self.min_ioi_frames);
                if spaced {
                    self.last_onset = Some(onset);
                }
                spaced
            }
            _ => false,
        }
    }

    /// Buffer index of the most recent confirmed onset
    pub fn last_onset(&self) -> Option<usize> {
        self.last_onset
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }
}

/// Buffer indices of every onset in `samples`
fn onset_frames(samples: &[f32], sample_rate: u32, buffer: usize, hop: usize, allow_simd: bool) -> MethodResult<Vec<usize>> {
    let mut tracker = OnsetTracker::new(buffer, hop, sample_rate, allow_simd)?;
    let mut onsets = Vec::new();
    for start in (0..samples.len().saturating_sub(buffer)).step_by(hop) {
        if tracker.process(&samples[start..start + buffer]) {
            if let Some(frame) = tracker.last_onset() {
                onsets.push(frame);
            }
        }
    }
    Ok(onsets)
}

fn check_signal(samples: &[f32], buffer: usize) -> MethodResult<()> {
    if samples.len() <= buffer {
        return Err(Abstained::insufficient("shorter than one toolkit buffer"));
    }
    if samples.iter().all(|&s| s == 0.0) {
        return Err(Abstained::insufficient("silent signal"));
    }
    Ok(())
}

/// Number of onsets the streaming tracker finds
pub fn count_onsets(samples: &[f32], sample_rate: u32, config: &AnalysisConfig, allow_simd: bool) -> MethodResult<usize> {
    let buffer = config.toolkit_buffer_size;
    check_signal(samples, buffer)?;
    let onsets = onset_frames(samples, sample_rate, buffer, config.toolkit_hop_size, allow_simd)?;
    Ok(onsets.len())
}

/// Median per-chunk tempo from inter-onset intervals
pub fn estimate_tempo(samples: &[f32], sample_rate: u32, config: &AnalysisConfig, allow_simd: bool) -> MethodResult<f32> {
    let buffer = config.toolkit_buffer_size;
    let hop = config.toolkit_hop_size;
    check_signal(samples, buffer)?;

    let chunk_len = ((config.tempo_chunk_secs * sample_rate as f32) as usize).max(buffer * 2);
    let step = ((chunk_len as f32 * (1.0 - config.tempo_chunk_overlap.clamp(0.0, 0.9))) as usize).max(1);

    let chunks: Vec<&[f32]> = if samples.len() <= chunk_len {
        vec![samples]
    } else {
        (0..=samples.len() - chunk_len)
            .step_by(step)
            .map(|start| &samples[start..start + chunk_len])
            .collect()
    };

    let secs_per_frame = hop as f32 / sample_rate as f32;
    let mut tempos = Vec::new();
    for chunk in chunks {
        let onsets = onset_frames(chunk, sample_rate, buffer, hop, allow_simd)?;
        if onsets.len() < 3 {
            continue;
        }
        let mut intervals: Vec<f32> = onsets
            .windows(2)
            .map(|w| (w[1] - w[0]) as f32 * secs_per_frame)
            .collect();
        let ioi = stats::median(&mut intervals);
        if ioi <= 0.0 {
            continue;
        }
        if let Some(bpm) = fold_into_range(60.0 / ioi, config.min_bpm, config.max_bpm) {
            tempos.push(bpm);
        }
    }

    if tempos.is_empty() {
        return Err(Abstained::insufficient("too few onsets for a tempo"));
    }
    Ok(stats::median(&mut tempos))
}

/// Octave-fold a tempo into `[min, max]`
fn fold_into_range(mut bpm: f32, min: f32, max: f32) -> Option<f32> {
    if !bpm.is_finite() || bpm <= 0.0 || min <= 0.0 || max < min * 2.0 {
        return (bpm >= min && bpm <= max).then_some(bpm);
    }
    while bpm < min {
        bpm *= 2.0;
    }
    while bpm > max {
        bpm /= 2.0;
    }
    Some(bpm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testgen;

    #[test]
    fn test_invalid_geometry_is_rejected() {
        assert!(OnsetTracker::new(256, 512, 22050, false).is_err());
        assert!(OnsetTracker::new(1024, 0, 22050, false).is_err());
    }

    #[test]
    fn test_pulse_train_onsets_and_tempo() {
        let sr = 22050;
        let samples = testgen::pulse_train(11264, 256, 4.0, sr, 0.9);
        let config = AnalysisConfig::default();

        let onsets = count_onsets(&samples, sr, &config, false).unwrap();
        assert!(onsets >= 6, "onsets = {}", onsets);

        let bpm = estimate_tempo(&samples, sr, &config, false).unwrap();
        assert!((bpm - 117.45).abs() < 3.0, "bpm = {}", bpm);
    }

    #[test]
    fn test_silence_and_short_clips_abstain() {
        let config = AnalysisConfig::default();
        assert!(count_onsets(&vec![0.0; 22050], 22050, &config, false).is_err());
        assert!(count_onsets(&[0.5; 100], 22050, &config, false).is_err());
    }

    #[test]
    fn test_fold_into_range() {
        assert_eq!(fold_into_range(240.0, 60.0, 200.0), Some(120.0));
        assert_eq!(fold_into_range(45.0, 60.0, 200.0), Some(90.0));
        assert_eq!(fold_into_range(0.0, 60.0, 200.0), None);
    }
}
