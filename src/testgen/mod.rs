// src/testgen/mod.rs
//
// Synthetic test signal generation.
// Deterministic sines, pulse trains, percussive hits and noise for unit and
// integration tests, plus 16-bit WAV and AIFF writers for on-disk fixtures.

use std::f32::consts::PI;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::decoder::Waveform;

/// Frequency of the tone inside each pulse of [`pulse_train`]
pub const PULSE_TONE_HZ: f32 = 1000.0;

fn sample_count(secs: f32, sample_rate: u32) -> usize {
    (secs.max(0.0) * sample_rate as f32).round() as usize
}

/// Pure sine tone
pub fn sine(freq: f32, secs: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let n = sample_count(secs, sample_rate);
    (0..n)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Digital silence
pub fn silence(secs: f32, sample_rate: u32) -> Vec<f32> {
    vec![0.0; sample_count(secs, sample_rate)]
}

/// Short tone bursts every `period` samples, starting at sample 0.
///
/// Each burst is `pulse_len` samples of a linearly decaying 1 kHz tone, so
/// the tempo is `60 * sample_rate / period` BPM.
pub fn pulse_train(period: usize, pulse_len: usize, secs: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let n = sample_count(secs, sample_rate);
    let mut out = vec![0.0; n];
    if period == 0 || pulse_len == 0 {
        return out;
    }

    for start in (0..n).step_by(period) {
        for i in 0..pulse_len.min(n - start) {
            let envelope = 1.0 - i as f32 / pulse_len as f32;
            let phase = 2.0 * PI * PULSE_TONE_HZ * i as f32 / sample_rate as f32;
            out[start + i] = amplitude * envelope * phase.sin();
        }
    }
    out
}

/// A single exponentially decaying tone, like a tuned drum or pluck.
///
/// `decay` is the time constant in seconds.
pub fn decaying_hit(freq: f32, secs: f32, sample_rate: u32, decay: f32) -> Vec<f32> {
    let decay = decay.max(1e-4);
    sine(freq, secs, sample_rate, 1.0)
        .into_iter()
        .enumerate()
        .map(|(i, s)| 0.9 * s * (-(i as f32 / sample_rate as f32) / decay).exp())
        .collect()
}

/// Uniform pseudo-random noise; the same seed always gives the same signal
pub fn noise(secs: f32, sample_rate: u32, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..sample_count(secs, sample_rate))
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
            amplitude * (unit * 2.0 - 1.0)
        })
        .collect()
}

/// Wrap samples as an in-memory waveform
pub fn waveform(samples: Vec<f32>, sample_rate: u32) -> Waveform {
    Waveform::new(samples, sample_rate)
}

/// Write interleaved samples as a 16-bit PCM WAV file
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let path = path.as_ref();
    if channels == 0 {
        bail!("cannot write a WAV with zero channels");
    }

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize().context("Failed to finalize WAV")?;
    Ok(())
}

/// IEEE 754 80-bit extended encoding of a sample rate, as AIFF's COMM chunk
/// stores it
fn extended_rate(rate: u32) -> [u8; 10] {
    let mut out = [0u8; 10];
    if rate == 0 {
        return out;
    }
    let exponent = 31 - rate.leading_zeros();
    let mantissa = (rate as u64) << (63 - exponent);
    out[..2].copy_from_slice(&((16383 + exponent) as u16).to_be_bytes());
    out[2..].copy_from_slice(&mantissa.to_be_bytes());
    out
}

/// Write interleaved samples as a 16-bit big-endian AIFF file
pub fn write_aiff<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let path = path.as_ref();
    if channels == 0 {
        bail!("cannot write an AIFF with zero channels");
    }

    let frames = (samples.len() / channels as usize) as u32;
    let data_len = frames * channels as u32 * 2;

    let mut bytes = Vec::with_capacity(54 + data_len as usize);
    bytes.extend_from_slice(b"FORM");
    bytes.extend_from_slice(&(4 + 26 + 16 + data_len).to_be_bytes());
    bytes.extend_from_slice(b"AIFF");

    bytes.extend_from_slice(b"COMM");
    bytes.extend_from_slice(&18u32.to_be_bytes());
    bytes.extend_from_slice(&channels.to_be_bytes());
    bytes.extend_from_slice(&frames.to_be_bytes());
    bytes.extend_from_slice(&16u16.to_be_bytes());
    bytes.extend_from_slice(&extended_rate(sample_rate));

    bytes.extend_from_slice(b"SSND");
    bytes.extend_from_slice(&(8 + data_len).to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    for &s in &samples[..(frames * channels as u32) as usize] {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&v.to_be_bytes());
    }

    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        assert_eq!(sine(440.0, 1.0, 22050, 0.5).len(), 22050);
        assert_eq!(silence(0.5, 22050).len(), 11025);
        assert_eq!(pulse_train(1000, 100, 1.0, 22050, 0.9).len(), 22050);
    }

    #[test]
    fn test_pulse_train_gaps_are_silent() {
        let pulses = pulse_train(1000, 100, 1.0, 22050, 0.9);
        assert!(pulses[..100].iter().any(|&s| s != 0.0));
        assert!(pulses[100..1000].iter().all(|&s| s == 0.0));
        assert!(pulses[1000..1100].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let a = noise(0.1, 22050, 0.5, 7);
        assert_eq!(a, noise(0.1, 22050, 0.5, 7));
        assert_ne!(a, noise(0.1, 22050, 0.5, 8));
        assert!(a.iter().all(|s| s.abs() <= 0.5));
    }

    #[test]
    fn test_decaying_hit_fades() {
        let hit = decaying_hit(200.0, 1.0, 22050, 0.1);
        let head = hit[..2205].iter().map(|s| s.abs()).fold(0.0, f32::max);
        let tail = hit[19845..].iter().map(|s| s.abs()).fold(0.0, f32::max);
        assert!(tail < head * 0.01);
    }

    #[test]
    fn test_write_wav_round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, &sine(440.0, 0.1, 22050, 0.5), 22050, 1).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.len(), 2205);
    }

    #[test]
    fn test_aiff_header_layout() {
        assert_eq!(extended_rate(44100), [0x40, 0x0E, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.aiff");
        write_aiff(&path, &sine(440.0, 0.1, 22050, 0.5), 22050, 1).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"FORM");
        assert_eq!(&bytes[8..12], b"AIFF");
        assert_eq!(bytes.len(), 54 + 2205 * 2);
        assert_eq!(u32::from_be_bytes(bytes[4..8].try_into().unwrap()) as usize, bytes.len() - 8);
    }
}
