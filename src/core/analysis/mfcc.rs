// src/core/analysis/mfcc.rs
//
// Mel-frequency cepstral coefficients from precomputed STFT magnitudes

use std::f32::consts::PI;

/// MFCC analysis parameters
#[derive(Debug, Clone)]
pub struct MfccParams {
    pub num_coefficients: usize,
    pub num_mel_bands: usize,
}

impl Default for MfccParams {
    fn default() -> Self {
        Self {
            num_coefficients: 13,
            num_mel_bands: 26,
        }
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank spanning 0 Hz to Nyquist.
///
/// Returns `num_mel_bands` rows of `freqs.len()` weights.
pub fn mel_filterbank(num_mel_bands: usize, freqs: &[f32], sample_rate: u32) -> Vec<Vec<f32>> {
    let mel_max = hz_to_mel(sample_rate as f32 / 2.0);
    let edges: Vec<f32> = (0..num_mel_bands + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (num_mel_bands + 1) as f32))
        .collect();

    (0..num_mel_bands)
        .map(|m| {
            let (lower, center, upper) = (edges[m], edges[m + 1], edges[m + 2]);
            freqs
                .iter()
                .map(|&f| {
                    let rising = if center > lower { (f - lower) / (center - lower) } else { 0.0 };
                    let falling = if upper > center { (upper - f) / (upper - center) } else { 0.0 };
                    rising.min(falling).max(0.0)
                })
                .collect()
        })
        .collect()
}

/// MFCCs of one magnitude frame
fn frame_mfcc(frame: &[f32], filterbank: &[Vec<f32>], num_coefficients: usize) -> Vec<f32> {
    let log_mel: Vec<f32> = filterbank
        .iter()
        .map(|weights| {
            let energy: f32 = weights.iter().zip(frame).map(|(w, m)| w * m * m).sum();
            10.0 * energy.max(1e-10).log10()
        })
        .collect();

    // Orthonormal DCT-II
    let m = log_mel.len() as f32;
    (0..num_coefficients)
        .map(|n| {
            let sum: f32 = log_mel
                .iter()
                .enumerate()
                .map(|(k, &v)| v * (PI * n as f32 * (k as f32 + 0.5) / m).cos())
                .sum();
            let scale = if n == 0 { (1.0 / m).sqrt() } else { (2.0 / m).sqrt() };
            sum * scale
        })
        .collect()
}

/// Per-coefficient mean of the MFCCs over all frames
pub fn mfcc_means(stft: &[Vec<f32>], freqs: &[f32], sample_rate: u32, params: &MfccParams) -> Vec<f32> {
    if stft.is_empty() || params.num_mel_bands == 0 {
        return vec![0.0; params.num_coefficients];
    }

    let filterbank = mel_filterbank(params.num_mel_bands, freqs, sample_rate);
    let mut sums = vec![0.0f32; params.num_coefficients];
    for frame in stft {
        for (acc, c) in sums.iter_mut().zip(frame_mfcc(frame, &filterbank, params.num_coefficients)) {
            *acc += c;
        }
    }

    let n = stft.len() as f32;
    sums.into_iter().map(|s| s / n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::spectral::stft_frequencies;

    #[test]
    fn test_filterbank_shape() {
        let freqs = stft_frequencies(2048, 22050);
        let bank = mel_filterbank(26, &freqs, 22050);
        assert_eq!(bank.len(), 26);
        for row in &bank {
            assert_eq!(row.len(), 1025);
            assert!(row.iter().all(|&w| (0.0..=1.0).contains(&w)));
            assert!(row.iter().any(|&w| w > 0.0));
        }
    }

    #[test]
    fn test_silent_frames_give_finite_coefficients() {
        let freqs = stft_frequencies(512, 22050);
        let stft = vec![vec![0.0; 257]; 4];
        let means = mfcc_means(&stft, &freqs, 22050, &MfccParams::default());
        assert_eq!(means.len(), 13);
        assert!(means.iter().all(|c| c.is_finite()));
        // Constant log-mel energies only load the zeroth coefficient
        assert!(means[1..].iter().all(|c| c.abs() < 1e-2));
    }
}
