// src/core/analysis/category.rs
//
// Category ensemble: filename keywords, band energy ratios and spectral
// shape rules, with a five-band fallback when no method commits.

use log::debug;

use crate::config::{AnalysisConfig, MethodId};
use crate::core::capability::{Capability, CapabilityProfile};
use crate::core::features::{FeatureSet, SignalContext};
use crate::core::voting::{run_method, Ballot, TieBreak, VoteResult};
use crate::detection::Category;
use crate::error::{Abstained, MethodResult};

/// Vote weight of a filename keyword match
pub const FILENAME_WEIGHT: u32 = 2;

/// Drum-piece keywords, checked before the category lists
const DRUM_PIECES: &[&[&str]] = &[
    &["kick", "bd", "bassdrum"],
    &["snare", "sd"],
    &["clap", "handclap"],
    &["hat", "hh", "hihat", "hi-hat"],
    &["cymbal", "crash", "ride"],
    &["perc", "shaker", "tambourine", "conga"],
];

/// Category keywords in priority order
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Bass, &["bass", "808", "sub", "low"]),
    (Category::Drums, &["kick", "snare", "hat", "cymbal", "perc", "drum", "clap"]),
    (Category::FX, &["fx", "effect", "sweep", "riser", "impact", "ambient", "foley"]),
    (Category::Melodic, &["lead", "melody", "synth", "key", "pad", "pluck", "chord"]),
    (Category::Vocals, &["vocal", "voice", "chop", "phrase", "word"]),
];

/// Keyword match over the lowercased path; `Unknown` when nothing matches
pub fn by_filename(path: &str) -> Category {
    let path = path.to_lowercase();

    if DRUM_PIECES
        .iter()
        .any(|keywords| keywords.iter().any(|k| path.contains(k)))
    {
        return Category::Drums;
    }

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| path.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Unknown)
}

/// Three-band energy ratios
pub fn by_frequency_bands(features: &FeatureSet, config: &AnalysisConfig) -> Category {
    if features.total_band_energy() <= 0.0 {
        return Category::Unknown;
    }

    if features.band_ratio("bass") > config.bass_ratio_threshold {
        Category::Bass
    } else if features.band_ratio("high") > config.high_ratio_threshold {
        Category::FX
    } else {
        Category::Melodic
    }
}

/// Spectral-shape decision rules, first match wins
pub fn by_spectral_shape(centroid: f32, rolloff: f32, zcr: f32, onset_strength: f32) -> Category {
    if centroid < 600.0 {
        Category::Bass
    } else if onset_strength > 0.5 && zcr > 0.05 {
        Category::Drums
    } else if rolloff > 8000.0 && zcr > 0.1 {
        Category::FX
    } else if (1000.0..=3000.0).contains(&centroid) && onset_strength < 0.3 {
        Category::Melodic
    } else if centroid > 3000.0 && zcr < 0.08 {
        Category::Vocals
    } else if centroid < 1000.0 && onset_strength > 0.3 {
        Category::Drums
    } else {
        Category::Melodic
    }
}

fn spectral_features(ctx: &SignalContext<'_>, features: &FeatureSet) -> MethodResult<Category> {
    if !ctx.has_energy() {
        return Err(Abstained::insufficient("silent signal"));
    }
    let advanced = features
        .advanced
        .as_ref()
        .ok_or_else(|| Abstained::failed("advanced features missing"))?;

    Ok(by_spectral_shape(
        advanced.centroid_mean,
        advanced.rolloff_mean,
        features.zero_crossing_rate,
        advanced.onset_strength_mean,
    ))
}

/// Five-band fallback; always returns a concrete category
pub fn band_fallback(features: &FeatureSet, config: &AnalysisConfig) -> Category {
    let total: f32 = features.fallback_band_energies.values().sum();
    if total <= 0.0 {
        return Category::Melodic;
    }

    let bass = features.fallback_ratio("sub_bass") + features.fallback_ratio("bass");
    let mid = features.fallback_ratio("low_mid") + features.fallback_ratio("mid");
    let high = features.fallback_ratio("high");

    if bass > config.bass_ratio_threshold {
        Category::Bass
    } else if high > config.high_ratio_threshold {
        Category::FX
    } else if mid > config.fallback_mid_ratio_threshold {
        Category::Melodic
    } else {
        Category::Drums
    }
}

/// `Unknown` is an abstention, not a vote
fn committed(category: Category) -> MethodResult<Category> {
    if category.is_known() {
        Ok(category)
    } else {
        Err(Abstained::insufficient("no category evidence"))
    }
}

/// Run every available category method and vote.
///
/// `label` is the path or name the filename method inspects.
pub fn classify(
    label: &str,
    ctx: &SignalContext<'_>,
    features: &FeatureSet,
    profile: &CapabilityProfile,
) -> VoteResult<Category> {
    let config = ctx.config();
    let mut ballot = Ballot::new();

    ballot.cast_weighted(
        MethodId::FilenameKeywords,
        run_method(
            MethodId::FilenameKeywords,
            config.is_method_enabled(MethodId::FilenameKeywords),
            || committed(by_filename(label)),
        ),
        FILENAME_WEIGHT,
    );
    ballot.cast(
        MethodId::FrequencyBands,
        run_method(
            MethodId::FrequencyBands,
            config.is_method_enabled(MethodId::FrequencyBands),
            || committed(by_frequency_bands(features, config)),
        ),
    );
    ballot.cast(
        MethodId::SpectralFeatures,
        run_method(
            MethodId::SpectralFeatures,
            config.is_method_enabled(MethodId::SpectralFeatures) && profile.allows(Capability::AdvancedSpectral),
            || spectral_features(ctx, features),
        ),
    );

    if let Some(result) = ballot.plurality(TieBreak::FirstRegistered) {
        debug!("Category {} from {:?}", result.winner, result.votes);
        return result;
    }

    let abstentions = ballot.abstentions().len();
    let fallback = band_fallback(features, config);
    debug!("No category votes, band fallback chose {}", fallback);
    VoteResult {
        votes: vec![fallback],
        voters: vec![MethodId::BandFallback],
        winner: fallback,
        tie_break_used: false,
        abstentions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn bands(pairs: &[(&str, f32)]) -> BTreeMap<String, f32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_filename_drum_pieces_win_first() {
        assert_eq!(by_filename("/Samples/Kick_Deep.wav"), Category::Drums);
        // "bassdrum" would otherwise match the bass list
        assert_eq!(by_filename("/lib/bassdrum 01.wav"), Category::Drums);
        assert_eq!(by_filename("/lib/sub_808.wav"), Category::Bass);
        assert_eq!(by_filename("/lib/riser-up.wav"), Category::FX);
        assert_eq!(by_filename("/lib/warm_pad_c.wav"), Category::Melodic);
        assert_eq!(by_filename("/lib/vox_phrase.wav"), Category::Vocals);
        assert_eq!(by_filename("/lib/untitled.wav"), Category::Unknown);
    }

    #[test]
    fn test_frequency_band_rules() {
        let config = AnalysisConfig::default();
        let mut features = FeatureSet::default();
        assert_eq!(by_frequency_bands(&features, &config), Category::Unknown);

        features.band_energies = bands(&[("bass", 7.0), ("mid", 2.0), ("high", 1.0)]);
        assert_eq!(by_frequency_bands(&features, &config), Category::Bass);

        features.band_energies = bands(&[("bass", 1.0), ("mid", 4.0), ("high", 5.0)]);
        assert_eq!(by_frequency_bands(&features, &config), Category::FX);

        features.band_energies = bands(&[("bass", 3.0), ("mid", 5.0), ("high", 2.0)]);
        assert_eq!(by_frequency_bands(&features, &config), Category::Melodic);
    }

    #[test]
    fn test_spectral_shape_rules() {
        assert_eq!(by_spectral_shape(400.0, 2000.0, 0.01, 0.9), Category::Bass);
        assert_eq!(by_spectral_shape(1500.0, 5000.0, 0.2, 0.9), Category::Drums);
        assert_eq!(by_spectral_shape(4000.0, 9000.0, 0.2, 0.1), Category::FX);
        assert_eq!(by_spectral_shape(2000.0, 4000.0, 0.02, 0.1), Category::Melodic);
        assert_eq!(by_spectral_shape(3500.0, 6000.0, 0.05, 0.1), Category::Vocals);
        assert_eq!(by_spectral_shape(800.0, 2000.0, 0.01, 0.4), Category::Drums);
        assert_eq!(by_spectral_shape(3500.0, 6000.0, 0.09, 0.1), Category::Melodic);
    }

    #[test]
    fn test_band_fallback() {
        let config = AnalysisConfig::default();
        let mut features = FeatureSet::default();
        assert_eq!(band_fallback(&features, &config), Category::Melodic);

        let spread = |values: [f32; 5]| {
            bands(&[
                ("sub_bass", values[0]),
                ("bass", values[1]),
                ("low_mid", values[2]),
                ("mid", values[3]),
                ("high", values[4]),
            ])
        };

        features.fallback_band_energies = spread([4.0, 3.0, 1.0, 1.0, 1.0]);
        assert_eq!(band_fallback(&features, &config), Category::Bass);
        features.fallback_band_energies = spread([1.0, 1.0, 1.0, 2.0, 5.0]);
        assert_eq!(band_fallback(&features, &config), Category::FX);
        features.fallback_band_energies = spread([1.0, 1.0, 3.0, 3.0, 2.0]);
        assert_eq!(band_fallback(&features, &config), Category::Melodic);
        features.fallback_band_energies = spread([2.0, 2.0, 2.0, 2.0, 2.0]);
        assert_eq!(band_fallback(&features, &config), Category::Drums);
    }
}
