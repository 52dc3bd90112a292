// src/core/analysis/tempo.rs
//
// Tempo ensemble. Each estimator reports a BPM inside the configured range
// or abstains; the final tempo is the median of what was reported.

use log::debug;

use crate::config::{AnalysisConfig, MethodId};
use crate::core::capability::{Capability, CapabilityProfile};
use crate::core::dsp::stats;
use crate::core::features::SignalContext;
use crate::core::voting::{run_method, Ballot, VoteResult};
use crate::error::{Abstained, MethodResult};
use super::spectral;

/// Strongest periodicity of the frame energy series.
///
/// Lags are searched from `floor(60 / max_bpm * sr / hop)` up to, but not
/// including, `floor(60 / min_bpm * sr / hop)`.
pub fn energy_autocorrelation(
    frame_energies: &[f32],
    sample_rate: u32,
    hop: usize,
    config: &AnalysisConfig,
) -> MethodResult<f32> {
    if frame_energies.len() < 4 {
        return Err(Abstained::insufficient("fewer than 4 energy frames"));
    }

    let frames_per_sec = sample_rate as f32 / hop as f32;
    let min_period = (60.0 / config.max_bpm * frames_per_sec) as usize;
    let max_period = (60.0 / config.min_bpm * frames_per_sec) as usize;
    if max_period >= frame_energies.len() {
        return Err(Abstained::insufficient("clip shorter than the slowest beat period"));
    }

    let ac = stats::autocorrelation(frame_energies, max_period);
    let search = &ac[min_period..max_period];
    if search.is_empty() || search.iter().all(|&v| v <= 0.0) {
        return Err(Abstained::insufficient("no periodic energy"));
    }

    // First maximum wins
    let offset = search
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0;
    let lag = min_period + offset;
    if lag == 0 {
        return Err(Abstained::insufficient("zero lag"));
    }

    let bpm = 60.0 / (lag as f32 / frames_per_sec);
    if config.bpm_in_range(bpm) {
        Ok(bpm)
    } else {
        Err(Abstained::insufficient(format!("{:.1} BPM outside range", bpm)))
    }
}

fn spectral_beat_tracker(ctx: &SignalContext<'_>) -> MethodResult<f32> {
    let config = ctx.config();
    let envelope = ctx.onset_envelope();
    let bpm = spectral::beat_tempo(envelope, ctx.onset_frame_rate(), config.min_bpm, config.max_bpm)
        .ok_or_else(|| Abstained::insufficient("no beat periodicity"))?;
    if config.bpm_in_range(bpm) {
        Ok(bpm)
    } else {
        Err(Abstained::insufficient(format!("{:.1} BPM outside range", bpm)))
    }
}

#[cfg(feature = "tempo-toolkit")]
fn toolkit_tempo(ctx: &SignalContext<'_>) -> MethodResult<f32> {
    super::toolkit::estimate_tempo(ctx.samples(), ctx.sample_rate(), ctx.config(), ctx.allow_simd())
}

#[cfg(not(feature = "tempo-toolkit"))]
fn toolkit_tempo(_ctx: &SignalContext<'_>) -> MethodResult<f32> {
    Err(Abstained::Unavailable)
}

/// Run every available tempo method; 0 BPM when none reports
pub fn estimate(ctx: &SignalContext<'_>, profile: &CapabilityProfile) -> VoteResult<f32> {
    let config = ctx.config();
    let mut ballot: Ballot<f32> = Ballot::new();

    ballot.cast(
        MethodId::EnergyAutocorrelation,
        run_method(
            MethodId::EnergyAutocorrelation,
            config.is_method_enabled(MethodId::EnergyAutocorrelation),
            || energy_autocorrelation(ctx.frame_energies(), ctx.sample_rate(), config.hop_length, config),
        ),
    );
    ballot.cast(
        MethodId::SpectralBeatTracker,
        run_method(
            MethodId::SpectralBeatTracker,
            config.is_method_enabled(MethodId::SpectralBeatTracker) && profile.allows(Capability::AdvancedSpectral),
            || spectral_beat_tracker(ctx),
        ),
    );
    ballot.cast(
        MethodId::ToolkitTempo,
        run_method(
            MethodId::ToolkitTempo,
            config.is_method_enabled(MethodId::ToolkitTempo) && profile.allows(Capability::TempoToolkit),
            || toolkit_tempo(ctx),
        ),
    );

    let result = ballot
        .median()
        .unwrap_or_else(|| VoteResult::undetermined(0.0, ballot.abstentions().len()));
    debug!("Tempo {:.2} BPM from {:?}", result.winner, result.votes);
    result
}
