// src/core/analysis/spectral.rs
//
// Short-time spectral descriptors used by the Advanced-mode estimators:
// frame-averaged shape statistics, onset strength with peak picking,
// beat-period estimation and pitch-class energy.

use crate::core::dsp::stats;

/// Frame-averaged spectral shape
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameShape {
    pub centroid: f32,
    pub rolloff: f32,
    pub bandwidth: f32,
}

/// Centre frequencies of the `n_fft / 2 + 1` bins of one STFT frame
pub fn stft_frequencies(n_fft: usize, sample_rate: u32) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}

/// Mean centroid, rolloff and bandwidth across frames
pub fn frame_shape(stft: &[Vec<f32>], freqs: &[f32], rolloff_percent: f32) -> FrameShape {
    if stft.is_empty() {
        return FrameShape::default();
    }

    let centroids: Vec<f32> = stft.iter().map(|f| stats::spectral_centroid(f, freqs)).collect();
    let rolloffs: Vec<f32> = stft
        .iter()
        .map(|f| stats::spectral_rolloff(f, freqs, rolloff_percent))
        .collect();
    let bandwidths: Vec<f32> = stft.iter().map(|f| stats::spectral_spread(f, freqs)).collect();

    FrameShape {
        centroid: stats::mean(&centroids),
        rolloff: stats::mean(&rolloffs),
        bandwidth: stats::mean(&bandwidths),
    }
}

/// Onset strength envelope: mean positive log-power flux per frame.
///
/// Log power is floored 80 dB below the loudest bin. The first frame has no
/// predecessor and is 0.
pub fn onset_strength(stft: &[Vec<f32>]) -> Vec<f32> {
    const TOP_DB: f32 = 80.0;

    let db: Vec<Vec<f32>> = stft
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|m| 10.0 * (m * m).max(1e-10).log10())
                .collect()
        })
        .collect();

    let peak = db
        .iter()
        .flat_map(|f| f.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;

    let mut envelope = Vec::with_capacity(db.len());
    for t in 0..db.len() {
        if t == 0 {
            envelope.push(0.0);
            continue;
        }
        let (prev, curr) = (&db[t - 1], &db[t]);
        let bins = curr.len().max(1) as f32;
        let flux: f32 = prev
            .iter()
            .zip(curr)
            .map(|(&p, &c)| (c.max(floor) - p.max(floor)).max(0.0))
            .sum();
        envelope.push(flux / bins);
    }
    envelope
}

/// Peak-pick onset frames from a strength envelope.
///
/// The envelope is min-max normalized; a frame is an onset when it is the
/// local maximum over the previous 30 ms, exceeds the surrounding 100 ms mean
/// by 0.07 and lies more than 30 ms after the previous onset.
pub fn pick_onsets(envelope: &[f32], frame_rate: f32) -> Vec<usize> {
    const DELTA: f32 = 0.07;

    let lo = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = envelope.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if envelope.is_empty() || hi - lo < 1e-10 {
        return Vec::new();
    }
    let norm: Vec<f32> = envelope.iter().map(|v| (v - lo) / (hi - lo)).collect();

    let pre_max = (0.03 * frame_rate).floor() as usize;
    let post_max = 1;
    let pre_avg = (0.10 * frame_rate).floor() as usize;
    let post_avg = pre_avg + 1;
    let wait = (0.03 * frame_rate).floor() as usize;

    let n = norm.len();
    let mut onsets = Vec::new();
    let mut last: Option<usize> = None;

    for i in 0..n {
        let max_window = &norm[i.saturating_sub(pre_max)..(i + post_max).min(n)];
        let local_max = max_window.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if norm[i] < local_max {
            continue;
        }

        let avg_window = &norm[i.saturating_sub(pre_avg)..(i + post_avg).min(n)];
        if norm[i] < stats::mean(avg_window) + DELTA {
            continue;
        }

        if let Some(prev) = last {
            if i - prev <= wait {
                continue;
            }
        }
        onsets.push(i);
        last = Some(i);
    }
    onsets
}

/// Normalized autocorrelation a beat lag must reach to count as periodic
pub const MIN_BEAT_PERIODICITY: f32 = 0.3;

/// Dominant beat tempo of an onset envelope.
///
/// Autocorrelation of the mean-removed envelope is searched over lags inside
/// the BPM range, weighted by a log-normal prior centred on 120 BPM (one
/// octave deviation). The envelope must span the slowest beat period and the
/// winning lag must reach [`MIN_BEAT_PERIODICITY`] of the zero-lag energy.
pub fn beat_tempo(envelope: &[f32], frame_rate: f32, min_bpm: f32, max_bpm: f32) -> Option<f32> {
    if envelope.len() < 2 || frame_rate <= 0.0 || min_bpm <= 0.0 {
        return None;
    }

    let lag_min = ((60.0 * frame_rate / max_bpm).ceil() as usize).max(1);
    let lag_max = (60.0 * frame_rate / min_bpm).floor() as usize;
    if envelope.len() <= lag_max || lag_min > lag_max {
        return None;
    }

    let mean = stats::mean(envelope);
    let centred: Vec<f32> = envelope.iter().map(|v| v - mean).collect();
    let ac = stats::autocorrelation(&centred, lag_max);
    if ac[0] <= 1e-12 {
        return None;
    }

    let mut best: Option<(f32, usize)> = None;
    for lag in lag_min..ac.len() {
        if ac[lag] <= 0.0 {
            continue;
        }
        let bpm = 60.0 * frame_rate / lag as f32;
        let prior = (-0.5 * (bpm / 120.0).log2().powi(2)).exp();
        let score = ac[lag] * prior;
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, lag));
        }
    }

    let (_, lag) = best?;
    if ac[lag] / ac[0] < MIN_BEAT_PERIODICITY {
        return None;
    }
    Some(60.0 * frame_rate / lag as f32)
}

/// Accumulated energy per pitch class (index 0 = C)
pub fn chroma(stft: &[Vec<f32>], freqs: &[f32]) -> [f32; 12] {
    const LOWEST_HZ: f32 = 27.5;

    let mut bins = [0.0f32; 12];
    for frame in stft {
        for (m, &f) in frame.iter().zip(freqs) {
            if f < LOWEST_HZ {
                continue;
            }
            let midi = 69.0 + 12.0 * (f / 440.0).log2();
            let pc = (midi.round() as i64).rem_euclid(12) as usize;
            bins[pc] += m * m;
        }
    }
    bins
}
