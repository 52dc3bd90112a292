// src/core/decoder.rs
//
// Audio ingestion: decode a file into a mono waveform at the target rate.
// Symphonia with band-limited resampling when the host allows it, otherwise
// the baseline path: symphonia (or hound for plain WAV) with
// linear-interpolation resampling.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use super::capability::{Capability, CapabilityProfile};

/// Which ingestion path produced a waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    Primary,
    Baseline,
    /// Samples supplied directly by the caller
    InMemory,
}

impl DecoderKind {
    pub fn name(&self) -> &'static str {
        match self {
            DecoderKind::Primary => "primary-decoder",
            DecoderKind::Baseline => "baseline-decoder",
            DecoderKind::InMemory => "in-memory",
        }
    }
}

/// Mono waveform at a fixed sample rate, immutable after ingestion
#[derive(Debug, Clone)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
    decoder: DecoderKind,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            decoder: DecoderKind::InMemory,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn decoder(&self) -> DecoderKind {
        self.decoder
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Interleaved decoder output before mono conversion
struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

/// Load an audio file as a mono waveform at the configured target rate.
///
/// Fails with `Io` when the file cannot be opened and with `Decode` when no
/// available decoder understands it.
pub fn load(
    path: &Path,
    profile: &CapabilityProfile,
    config: &AnalysisConfig,
) -> std::result::Result<Waveform, AnalysisError> {
    let metadata = std::fs::metadata(path).map_err(|e| AnalysisError::io(path, e))?;
    if !metadata.is_file() {
        return Err(AnalysisError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }
    File::open(path).map_err(|e| AnalysisError::io(path, e))?;

    let target = config.target_sample_rate;

    if profile.allows(Capability::PrimaryDecoder) {
        let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            load_primary(path, target)
        }));
        match attempt {
            Ok(Ok(waveform)) => return Ok(waveform),
            Ok(Err(e)) => warn!(
                "Primary decoder failed for {}, using baseline: {:#}",
                path.display(),
                e
            ),
            Err(_) => warn!(
                "Primary decoder panicked on {}, using baseline",
                path.display()
            ),
        }
    }

    let use_symphonia = profile.is_available(Capability::PrimaryDecoder);
    load_baseline(path, target, use_symphonia)
        .map_err(|e| AnalysisError::decode(path, format!("{:#}", e)))
}

#[cfg(feature = "primary-decoder")]
fn load_primary(path: &Path, target: u32) -> Result<Waveform> {
    let audio = decode_symphonia(path)?;
    let mono = extract_mono(&audio.samples, audio.channels);
    let samples = if audio.sample_rate != target {
        resample_sinc(mono, audio.sample_rate, target)?
    } else {
        mono
    };
    debug!(
        "Decoded {} with symphonia ({} Hz, {} ch)",
        path.display(),
        audio.sample_rate,
        audio.channels
    );
    Ok(Waveform {
        samples,
        sample_rate: target,
        decoder: DecoderKind::Primary,
    })
}

#[cfg(not(feature = "primary-decoder"))]
fn load_primary(_path: &Path, _target: u32) -> Result<Waveform> {
    bail!("primary decoder not compiled in")
}

fn load_baseline(path: &Path, target: u32, use_symphonia: bool) -> Result<Waveform> {
    let audio = decode_baseline(path, use_symphonia)?;
    let mono = extract_mono(&audio.samples, audio.channels);
    let samples = if audio.sample_rate != target {
        resample_linear(&mono, audio.sample_rate, target)
    } else {
        mono
    };
    debug!(
        "Decoded {} with baseline reader ({} Hz, {} ch)",
        path.display(),
        audio.sample_rate,
        audio.channels
    );
    Ok(Waveform {
        samples,
        sample_rate: target,
        decoder: DecoderKind::Baseline,
    })
}

#[cfg(feature = "primary-decoder")]
fn decode_symphonia(path: &Path) -> Result<DecodedAudio> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
    use symphonia::core::errors::Error;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe file format")?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No supported audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("File does not specify sample rate")?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    if channels == 0 {
        bail!("File reports 0 audio channels");
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder for audio codec")?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if samples.is_empty() {
        bail!("No audio samples decoded from file");
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(not(feature = "primary-decoder"))]
fn decode_symphonia(_path: &Path) -> Result<DecodedAudio> {
    bail!("symphonia not compiled in")
}

/// Scalar-safe decode: symphonia for every container it knows, hound as the
/// last resort for WAV
fn decode_baseline(path: &Path, use_symphonia: bool) -> Result<DecodedAudio> {
    if use_symphonia {
        let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            decode_symphonia(path)
        }));
        match attempt {
            Ok(Ok(audio)) => return Ok(audio),
            Ok(Err(e)) => debug!(
                "Symphonia could not read {}, trying WAV reader: {:#}",
                path.display(),
                e
            ),
            Err(_) => warn!(
                "Symphonia panicked on {}, trying WAV reader",
                path.display()
            ),
        }
    }
    decode_wav(path)
}

fn decode_wav(path: &Path) -> Result<DecodedAudio> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Not a readable WAV file: {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        bail!("File reports 0 audio channels");
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("Corrupted float sample data")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("Corrupted integer sample data")?
        }
    };

    if samples.is_empty() {
        bail!("No audio samples decoded from file");
    }

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels,
    })
}

/// Average interleaved channels into mono
pub fn extract_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampling over a recomputed time index.
///
/// Output length is `floor(len * to / from)`; sample positions are spread
/// evenly from the first to the last input sample. No anti-alias filtering.
pub fn resample_linear(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || samples.is_empty() || from == 0 {
        return samples.to_vec();
    }

    let new_len = (samples.len() as f64 * to as f64 / from as f64) as usize;
    if new_len == 0 {
        return Vec::new();
    }
    if new_len == 1 || samples.len() == 1 {
        return vec![samples[0]; new_len];
    }

    let step = (samples.len() - 1) as f64 / (new_len - 1) as f64;
    (0..new_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            if idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            }
        })
        .collect()
}

#[cfg(feature = "primary-decoder")]
fn resample_sinc(samples: Vec<f32>, from: u32, to: u32) -> Result<Vec<f32>> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
        WindowFunction,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to as f64 / from as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .context("Failed to build resampler")?;

    let waves_in = vec![samples];
    let waves_out = resampler
        .process(&waves_in, None)
        .context("Resampling failed")?;
    waves_out
        .into_iter()
        .next()
        .context("Resampler produced no channels")
}
