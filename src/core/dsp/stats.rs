//! Statistical and spectral analysis functions

/// Arithmetic mean, 0 for empty input
pub fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

/// Population standard deviation
pub fn std_dev(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / data.len() as f32;
    variance.sqrt()
}

/// Compute median of a slice
pub fn median(data: &mut [f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }

    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = data.len() / 2;
    if data.len() % 2 == 0 {
        (data[mid - 1] + data[mid]) / 2.0
    } else {
        data[mid]
    }
}

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Sum of squares over one frame
pub fn energy(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s * s).sum()
}

/// Start offsets of the non-overlapping frames an envelope is built from.
///
/// Frames begin at `0, frame, 2*frame, ...` strictly below `len - frame`, so
/// the last full frame is never included and a clip of one frame or less
/// yields no frames.
pub fn frame_starts(len: usize, frame: usize) -> impl Iterator<Item = usize> {
    let end = if frame == 0 { 0 } else { len.saturating_sub(frame) };
    (0..end).step_by(frame.max(1))
}

/// Per-frame sum of squares
pub fn frame_energies(samples: &[f32], frame: usize) -> Vec<f32> {
    frame_starts(samples.len(), frame)
        .map(|i| energy(&samples[i..i + frame]))
        .collect()
}

/// Per-frame RMS
pub fn frame_rms(samples: &[f32], frame: usize) -> Vec<f32> {
    frame_starts(samples.len(), frame)
        .map(|i| rms(&samples[i..i + frame]))
        .collect()
}

/// Zero-crossing rate as sign changes per sample.
///
/// Negative zero counts as negative, matching a sign-bit test.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings: usize = samples
        .windows(2)
        .filter(|w| w[0].is_sign_negative() != w[1].is_sign_negative())
        .count();

    crossings as f32 / samples.len() as f32
}

/// Raw (unnormalized) autocorrelation for lags `0..=max_lag`
pub fn autocorrelation(samples: &[f32], max_lag: usize) -> Vec<f32> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }
    let max_lag = max_lag.min(n - 1);

    (0..=max_lag)
        .map(|lag| {
            samples[..n - lag]
                .iter()
                .zip(&samples[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Spectral centroid over explicit bin frequencies
pub fn spectral_centroid(magnitudes: &[f32], freqs: &[f32]) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total < 1e-10 {
        return 0.0;
    }

    let weighted: f32 = magnitudes.iter().zip(freqs).map(|(m, f)| m * f).sum();
    weighted / total
}

/// Spectral spread (bandwidth) around the centroid
pub fn spectral_spread(magnitudes: &[f32], freqs: &[f32]) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total < 1e-10 {
        return 0.0;
    }

    let centroid = spectral_centroid(magnitudes, freqs);
    let variance: f32 = magnitudes
        .iter()
        .zip(freqs)
        .map(|(m, f)| {
            let diff = f - centroid;
            diff * diff * m
        })
        .sum();

    (variance / total).sqrt()
}

/// Frequency below which `percentile` of the magnitude sum is contained
pub fn spectral_rolloff(magnitudes: &[f32], freqs: &[f32], percentile: f32) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total < 1e-10 {
        return 0.0;
    }
    let threshold = total * percentile;

    let mut cumulative = 0.0f32;
    for (m, f) in magnitudes.iter().zip(freqs) {
        cumulative += m;
        if cumulative >= threshold {
            return *f;
        }
    }

    freqs.last().copied().unwrap_or(0.0)
}

/// Pearson correlation, `None` when either side has zero variance
pub fn pearson_correlation(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mean_a = mean(a);
    let mean_b = mean(b);
    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < 1e-12 {
        None
    } else {
        Some(cov / denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        let samples = vec![1.0, -1.0, 1.0, -1.0];
        assert!((rms(&samples) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    #[test]
    fn test_frames_exclude_last_full_frame() {
        // 4 frames of 4 samples: starts 0, 4, 8 (12 is excluded)
        let samples = vec![1.0; 16];
        assert_eq!(frame_energies(&samples, 4), vec![4.0, 4.0, 4.0]);
        assert!(frame_rms(&[1.0; 4], 4).is_empty());
    }

    #[test]
    fn test_zero_crossing_rate() {
        let alternating = vec![1.0, -1.0, 1.0, -1.0];
        assert!((zero_crossing_rate(&alternating) - 0.75).abs() < 1e-6);
        assert_eq!(zero_crossing_rate(&[0.0; 10]), 0.0);
    }

    #[test]
    fn test_centroid_and_rolloff() {
        let freqs = vec![0.0, 100.0, 200.0, 300.0];
        let mags = vec![0.0, 0.0, 1.0, 0.0];
        assert!((spectral_centroid(&mags, &freqs) - 200.0).abs() < 1e-3);
        assert_eq!(spectral_rolloff(&mags, &freqs, 0.85), 200.0);
        assert_eq!(spectral_spread(&mags, &freqs), 0.0);
    }

    #[test]
    fn test_pearson() {
        let a = [1.0, 2.0, 3.0];
        assert!((pearson_correlation(&a, &[2.0, 4.0, 6.0]).unwrap() - 1.0).abs() < 1e-5);
        assert!(pearson_correlation(&a, &[1.0, 1.0, 1.0]).is_none());
    }
}
