// src/core/analysis/key.rs
//
// Key ensemble: nearest pitch class of the dominant spectral peak, and
// chroma correlation against Krumhansl-Schmuckler key profiles.

use log::debug;

use crate::config::{AnalysisConfig, MethodId};
use crate::core::capability::{Capability, CapabilityProfile};
use crate::core::dsp::stats;
use crate::core::features::{FeatureSet, SignalContext};
use crate::core::voting::{run_method, Ballot, TieBreak, VoteResult};
use crate::detection::UNKNOWN_KEY;
use crate::error::{Abstained, MethodResult};
use super::spectral;

/// Pitch classes starting at C
pub const PITCH_CLASSES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

const MAJOR_PROFILE: [f32; 12] = [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88];
const MINOR_PROFILE: [f32; 12] = [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17];

/// A named key with its expected pitch-class distribution
#[derive(Debug, Clone)]
pub struct KeyProfile {
    pub name: String,
    pub weights: [f32; 12],
}

/// Base profile rotated so its tonic weight sits on `tonic`
fn rotate(base: &[f32; 12], tonic: usize) -> [f32; 12] {
    let mut out = [0.0; 12];
    for (degree, &w) in base.iter().enumerate() {
        out[(degree + tonic) % 12] = w;
    }
    out
}

/// All 24 key profiles: C Major, C Minor, C# Major, ...
pub fn key_profiles() -> Vec<KeyProfile> {
    PITCH_CLASSES
        .iter()
        .enumerate()
        .flat_map(|(tonic, pc)| {
            [
                KeyProfile {
                    name: format!("{} Major", pc),
                    weights: rotate(&MAJOR_PROFILE, tonic),
                },
                KeyProfile {
                    name: format!("{} Minor", pc),
                    weights: rotate(&MINOR_PROFILE, tonic),
                },
            ]
        })
        .collect()
}

/// Best-correlated key, if it correlates above `threshold`
pub fn match_key_profile(chroma: &[f32; 12], profiles: &[KeyProfile], threshold: f32) -> Option<String> {
    let total: f32 = chroma.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let normalized: Vec<f32> = chroma.iter().map(|c| c / total).collect();

    let mut best: Option<(&KeyProfile, f32)> = None;
    for profile in profiles {
        let Some(r) = stats::pearson_correlation(&normalized, &profile.weights) else {
            continue;
        };
        if best.map_or(true, |(_, b)| r > b) {
            best = Some((profile, r));
        }
    }

    best.filter(|&(_, r)| r > threshold)
        .map(|(profile, _)| profile.name.clone())
}

/// Nearest pitch class of the dominant frequency, always reported as Major
pub fn from_dominant_frequency(freq: f32) -> MethodResult<String> {
    if freq <= 0.0 || !freq.is_finite() {
        return Err(Abstained::insufficient("no dominant frequency"));
    }
    let semitones_from_a = 12.0 * (freq / 440.0).log2();
    // A sits at index 9 of the C-based names
    let idx = (semitones_from_a.round() as i64 + 9).rem_euclid(12) as usize;
    Ok(format!("{} Major", PITCH_CLASSES[idx]))
}

fn chroma_profile(ctx: &SignalContext<'_>, config: &AnalysisConfig) -> MethodResult<String> {
    let chroma = spectral::chroma(ctx.stft(), &ctx.stft_frequencies());
    match_key_profile(&chroma, &key_profiles(), config.chroma_threshold)
        .ok_or_else(|| Abstained::insufficient("no key profile above threshold"))
}

/// Most frequent key among the estimators; ties go to the first reported
pub fn estimate(ctx: &SignalContext<'_>, features: &FeatureSet, profile: &CapabilityProfile) -> VoteResult<String> {
    let config = ctx.config();
    let mut ballot: Ballot<String> = Ballot::new();

    ballot.cast(
        MethodId::DominantFrequency,
        run_method(
            MethodId::DominantFrequency,
            config.is_method_enabled(MethodId::DominantFrequency),
            || from_dominant_frequency(features.dominant_frequency),
        ),
    );
    ballot.cast(
        MethodId::ChromaProfile,
        run_method(
            MethodId::ChromaProfile,
            config.is_method_enabled(MethodId::ChromaProfile) && profile.allows(Capability::AdvancedSpectral),
            || chroma_profile(ctx, config),
        ),
    );

    let result = ballot
        .plurality(TieBreak::FirstRegistered)
        .unwrap_or_else(|| VoteResult::undetermined(UNKNOWN_KEY.to_string(), ballot.abstentions().len()));
    debug!("Key {} from {:?}", result.winner, result.votes);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_frequency_names() {
        assert_eq!(from_dominant_frequency(440.0).unwrap(), "A Major");
        assert_eq!(from_dominant_frequency(261.63).unwrap(), "C Major");
        assert_eq!(from_dominant_frequency(220.0).unwrap(), "A Major");
        assert_eq!(from_dominant_frequency(466.16).unwrap(), "A# Major");
        assert!(from_dominant_frequency(0.0).is_err());
    }

    #[test]
    fn test_profiles_are_rotated_onto_tonic() {
        let profiles = key_profiles();
        assert_eq!(profiles.len(), 24);
        assert_eq!(profiles[0].name, "C Major");
        assert_eq!(profiles[1].name, "C Minor");

        let g_major = profiles.iter().find(|p| p.name == "G Major").unwrap();
        assert_eq!(g_major.weights[7], MAJOR_PROFILE[0]);
        // Dominant of G is D
        assert_eq!(g_major.weights[2], MAJOR_PROFILE[7]);
    }

    #[test]
    fn test_chroma_equal_to_profile_selects_that_key() {
        let profiles = key_profiles();
        for target in ["G Major", "E Minor", "C# Major"] {
            let chroma = profiles.iter().find(|p| p.name == target).unwrap().weights;
            assert_eq!(match_key_profile(&chroma, &profiles, 0.6).as_deref(), Some(target));
        }
    }

    #[test]
    fn test_flat_or_empty_chroma_is_unknown() {
        let profiles = key_profiles();
        assert_eq!(match_key_profile(&[1.0; 12], &profiles, 0.6), None);
        assert_eq!(match_key_profile(&[0.0; 12], &profiles, 0.6), None);
    }
}
