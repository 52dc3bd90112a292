//! FFT processing with windowing
//!
//! All transforms go through [`Planner`], which selects between rustfft's
//! SIMD-dispatching planner and its scalar-only planner. Safe mode hosts
//! never touch the vectorized kernels.

use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner, FftPlannerScalar};

use super::windows::{create_window, WindowType};

/// FFT planner selection
pub enum Planner {
    /// Runtime-dispatched AVX/SSE/NEON kernels
    Accelerated(FftPlanner<f32>),
    /// Portable scalar kernels only
    Scalar(FftPlannerScalar<f32>),
}

impl Planner {
    pub fn new(allow_simd: bool) -> Self {
        if allow_simd {
            Planner::Accelerated(FftPlanner::new())
        } else {
            Planner::Scalar(FftPlannerScalar::new())
        }
    }

    pub fn plan_forward(&mut self, len: usize) -> Arc<dyn Fft<f32>> {
        match self {
            Planner::Accelerated(p) => p.plan_fft_forward(len),
            Planner::Scalar(p) => p.plan_fft_forward(len),
        }
    }

    pub fn is_accelerated(&self) -> bool {
        matches!(self, Planner::Accelerated(_))
    }
}

/// Magnitude spectrum of the whole signal in one transform.
///
/// Returns the first `len / 2` bins (positive frequencies, DC included).
/// Bin `k` sits at `k * sample_rate / len` Hz.
pub fn full_magnitude_spectrum(planner: &mut Planner, samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let fft = planner.plan_forward(samples.len());
    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .map(|&s| Complex::new(s, 0.0))
        .collect();

    fft.process(&mut buffer);

    buffer[..samples.len() / 2]
        .iter()
        .map(|c| c.norm())
        .collect()
}

/// Frame-wise FFT computation with windowing
pub struct FftProcessor {
    planner: Planner,
    window: Vec<f32>,
    fft_size: usize,
}

impl FftProcessor {
    pub fn new(fft_size: usize, window_type: WindowType, allow_simd: bool) -> Self {
        let window = create_window(fft_size, window_type);
        Self {
            planner: Planner::new(allow_simd),
            window,
            fft_size,
        }
    }

    /// Compute magnitude spectrum of one frame (`fft_size / 2 + 1` bins)
    pub fn magnitude_spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        let fft = self.planner.plan_forward(self.fft_size);

        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .take(self.fft_size)
            .enumerate()
            .map(|(i, &s)| Complex::new(s * self.window[i], 0.0))
            .collect();

        // Zero-pad if necessary
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        fft.process(&mut buffer);

        buffer[..self.fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }

    /// Short-time magnitude spectra.
    ///
    /// The signal is zero-padded by half a frame on both sides so that frame
    /// `t` is centred on sample `t * hop`; clips shorter than one frame still
    /// yield at least one spectrum.
    pub fn stft(&mut self, samples: &[f32], hop: usize) -> Vec<Vec<f32>> {
        if samples.is_empty() || hop == 0 {
            return Vec::new();
        }

        let pad = self.fft_size / 2;
        let mut padded = vec![0.0f32; pad];
        padded.extend_from_slice(samples);
        padded.resize(padded.len() + pad, 0.0);

        let num_frames = 1 + samples.len() / hop;
        let mut frames = Vec::with_capacity(num_frames);
        for t in 0..num_frames {
            let start = t * hop;
            let end = (start + self.fft_size).min(padded.len());
            frames.push(self.magnitude_spectrum(&padded[start..end]));
        }
        frames
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

/// Frequency of FFT bin `bin` for a transform of length `fft_len`
pub fn bin_frequency(bin: usize, fft_len: usize, sample_rate: u32) -> f32 {
    if fft_len == 0 {
        return 0.0;
    }
    bin as f32 * sample_rate as f32 / fft_len as f32
}
