// src/core/analysis/sample_type.rs
//
// One-shot vs loop ensemble

use log::debug;

use crate::config::{AnalysisConfig, MethodId};
use crate::core::capability::{Capability, CapabilityProfile};
use crate::core::dsp::stats;
use crate::core::features::SignalContext;
use crate::core::voting::{run_method, Ballot, TieBreak, VoteResult};
use crate::detection::SampleType;
use crate::error::{Abstained, MethodResult};
use super::spectral;

/// Energy fade: a clip whose tail carries well under half the energy of its
/// head is a one-shot.
pub fn energy_fade(frame_rms: &[f32], config: &AnalysisConfig) -> SampleType {
    let n = frame_rms.len();
    if n < 2 {
        return SampleType::OneShot;
    }

    let portion = (n as f32 * config.fade_portion) as usize;
    if portion == 0 {
        return SampleType::OneShot;
    }

    let start = stats::mean(&frame_rms[..portion]);
    let end = stats::mean(&frame_rms[n - portion..]);

    if end < start * config.fade_ratio {
        SampleType::OneShot
    } else {
        SampleType::Loop
    }
}

/// Onset density: count energy jumps standing well above the typical jump
pub fn onset_density(frame_energies: &[f32], config: &AnalysisConfig) -> SampleType {
    let diffs: Vec<f32> = frame_energies
        .windows(2)
        .map(|w| (w[1] - w[0]).max(0.0))
        .collect();
    if diffs.is_empty() {
        return SampleType::OneShot;
    }

    let threshold = stats::mean(&diffs) + config.onset_std_factor * stats::std_dev(&diffs);
    let onsets = diffs.iter().filter(|&&d| d > threshold).count();
    onsets_to_type(onsets, config)
}

fn onsets_to_type(onsets: usize, config: &AnalysisConfig) -> SampleType {
    if onsets <= config.max_oneshot_onsets {
        SampleType::OneShot
    } else {
        SampleType::Loop
    }
}

fn spectral_onsets(ctx: &SignalContext<'_>) -> MethodResult<SampleType> {
    let envelope = ctx.onset_envelope();
    if envelope.iter().all(|&v| v == 0.0) {
        return Err(Abstained::insufficient("flat onset envelope"));
    }
    let onsets = spectral::pick_onsets(envelope, ctx.onset_frame_rate());
    Ok(onsets_to_type(onsets.len(), ctx.config()))
}

#[cfg(feature = "tempo-toolkit")]
fn toolkit_onsets(ctx: &SignalContext<'_>) -> MethodResult<SampleType> {
    let onsets = super::toolkit::count_onsets(ctx.samples(), ctx.sample_rate(), ctx.config(), ctx.allow_simd())?;
    Ok(onsets_to_type(onsets, ctx.config()))
}

#[cfg(not(feature = "tempo-toolkit"))]
fn toolkit_onsets(_ctx: &SignalContext<'_>) -> MethodResult<SampleType> {
    Err(Abstained::Unavailable)
}

/// Majority over the collected votes; an exact tie goes to one-shot for
/// clips shorter than the configured duration, otherwise to loop
pub fn decide(ballot: &Ballot<SampleType>, duration_secs: f64, config: &AnalysisConfig) -> VoteResult<SampleType> {
    let by_duration = if duration_secs < config.tie_break_duration_secs as f64 {
        SampleType::OneShot
    } else {
        SampleType::Loop
    };

    ballot
        .plurality(TieBreak::Prefer(by_duration))
        .unwrap_or_else(|| VoteResult {
            tie_break_used: true,
            ..VoteResult::undetermined(by_duration, ballot.abstentions().len())
        })
}

/// Run every available sample-type method and vote
pub fn classify(ctx: &SignalContext<'_>, profile: &CapabilityProfile) -> VoteResult<SampleType> {
    let config = ctx.config();
    let mut ballot = Ballot::new();

    ballot.cast(
        MethodId::EnergyFade,
        run_method(MethodId::EnergyFade, config.is_method_enabled(MethodId::EnergyFade), || {
            Ok(energy_fade(ctx.frame_rms(), config))
        }),
    );
    ballot.cast(
        MethodId::OnsetDensity,
        run_method(MethodId::OnsetDensity, config.is_method_enabled(MethodId::OnsetDensity), || {
            Ok(onset_density(ctx.frame_energies(), config))
        }),
    );
    ballot.cast(
        MethodId::SpectralOnsets,
        run_method(
            MethodId::SpectralOnsets,
            config.is_method_enabled(MethodId::SpectralOnsets) && profile.allows(Capability::AdvancedSpectral),
            || spectral_onsets(ctx),
        ),
    );
    ballot.cast(
        MethodId::ToolkitOnsets,
        run_method(
            MethodId::ToolkitOnsets,
            config.is_method_enabled(MethodId::ToolkitOnsets) && profile.allows(Capability::TempoToolkit),
            || toolkit_onsets(ctx),
        ),
    );

    let result = decide(&ballot, ctx.duration_secs(), config);
    debug!(
        "Sample type {:?} from {:?} (tie-break: {})",
        result.winner, result.votes, result.tie_break_used
    );
    result
}
