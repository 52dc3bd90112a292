mod test_utils;

use samplescope::testgen;
use samplescope::{AnalysisMode, Category, SampleAnalyzer, SampleType, UNKNOWN_KEY};
use test_utils::*;

#[test]
fn test_results_stay_in_bounds() {
    for analyzer in [safe_analyzer(), advanced_analyzer()] {
        for (label, samples) in corpus() {
            let result = analyzer.analyze_waveform(label, &testgen::waveform(samples, SR));
            assert!(result.is_ok());
            assert_bounds(&result);
            assert!(result.sample_type.is_known(), "{}", label);
            assert!(result.category.is_known(), "{}", label);
        }
    }
}

#[test]
fn test_same_file_same_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "loop_a.wav", &testgen::pulse_train(PULSE_PERIOD, 256, 3.0, SR, 0.8));

    for analyzer in [safe_analyzer(), advanced_analyzer()] {
        let first = analyzer.analyze(&path);
        let second = analyzer.analyze(&path);
        assert!(first.is_ok());
        assert_eq!(first, second);
    }
}

#[test]
fn test_silence_falls_back_everywhere() {
    let analyzer = safe_analyzer();

    let short = analyzer.analyze_waveform("untitled", &testgen::waveform(testgen::silence(1.0, SR), SR));
    assert_eq!(short.category, Category::Melodic);
    assert_eq!(short.bpm, 0.0);
    assert_eq!(short.key, UNKNOWN_KEY);
    assert_eq!(short.sample_type, SampleType::OneShot);

    let long = analyzer.analyze_waveform("untitled", &testgen::waveform(testgen::silence(3.0, SR), SR));
    assert_eq!(long.category, Category::Melodic);
    assert_eq!(long.bpm, 0.0);
    assert_eq!(long.sample_type, SampleType::Loop);
}

#[test]
fn test_kick_in_path_means_drums() {
    let dir = tempfile::tempdir().unwrap();
    // A sustained bass tone that every spectral method would call Bass
    let path = write_fixture(dir.path(), "kick_deep.wav", &testgen::sine(60.0, 1.0, SR, 0.8));

    for analyzer in [safe_analyzer(), advanced_analyzer()] {
        let result = analyzer.analyze(&path);
        assert_eq!(result.category, Category::Drums);
        assert!(result.methods_used.contains("filename-keywords"));
    }
}

#[test]
fn test_pulse_train_tempo_and_loop() {
    let samples = testgen::pulse_train(PULSE_PERIOD, 256, 4.0, SR, 0.9);
    let result = safe_analyzer().analyze_waveform("untitled", &testgen::waveform(samples, SR));

    assert!(result.has_tempo());
    assert!((result.bpm - reference_bpm()).abs() < 3.0, "bpm = {}", result.bpm);
    assert_eq!(result.sample_type, SampleType::Loop);
    assert!(result.methods_used.contains("energy-autocorrelation"));
}

#[test]
fn test_one_shot_hit_gets_no_beat_vote() {
    let samples = testgen::decaying_hit(180.0, 0.6, SR, 0.08);
    let result = advanced_analyzer().analyze_waveform("untitled", &testgen::waveform(samples, SR));

    assert!(result.is_ok());
    assert!(!result.methods_used.contains("spectral-beat-tracker"));
    assert!(!result.methods_used.contains("energy-autocorrelation"));
}

#[test]
fn test_forced_safe_mode_still_classifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "pad.wav", &testgen::sine(330.0, 2.0, SR, 0.5));

    let analyzer = SampleAnalyzer::builder()
        .profile(advanced_analyzer().profile().clone())
        .force_safe_mode(true)
        .build();
    let result = analyzer.analyze(&path);

    assert!(result.is_ok());
    assert_eq!(result.mode, AnalysisMode::Safe);
    assert!(result.characteristics.advanced.is_none());
    for advanced_only in ["spectral-onsets", "spectral-features", "spectral-beat-tracker", "chroma-profile"] {
        assert!(!result.methods_used.contains(advanced_only), "{}", advanced_only);
    }
    assert_bounds(&result);
}

#[test]
fn test_advanced_mode_adds_spectral_features() {
    let samples = testgen::sine(330.0, 2.0, SR, 0.5);
    let result = advanced_analyzer().analyze_waveform("untitled", &testgen::waveform(samples, SR));

    assert_eq!(result.mode, AnalysisMode::Advanced);
    let advanced = result.characteristics.advanced.expect("advanced features");
    assert_eq!(advanced.mfcc_mean.len(), 13);
    assert!(result.methods_used.contains("spectral-features"));
}

#[test]
fn test_missing_file_reports_error() {
    let result = safe_analyzer().analyze("/no/such/dir/kick.wav");
    assert!(!result.is_ok());
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.category, Category::Unknown);
    assert_eq!(result.bpm, 0.0);
    assert!(result.error.unwrap().contains("kick.wav"));
}

#[test]
fn test_stereo_44k_is_brought_to_mono_22k() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    let mono = testgen::sine(440.0, 1.0, 44100, 0.5);
    let interleaved: Vec<f32> = mono.iter().flat_map(|&s| [s, 0.5 * s]).collect();
    testgen::write_wav(&path, &interleaved, 44100, 2).unwrap();

    let result = safe_analyzer().analyze(&path);
    assert!(result.is_ok());
    assert_eq!(result.sample_rate, 22050);
    assert!((result.duration - 1.0).abs() < 0.01);
}

#[cfg(feature = "primary-decoder")]
#[test]
fn test_safe_mode_reads_non_wav_containers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pad.aiff");
    testgen::write_aiff(&path, &testgen::sine(330.0, 1.0, 44100, 0.5), 44100, 1).unwrap();

    let safe = safe_analyzer().analyze(&path);
    assert!(safe.is_ok(), "{:?}", safe.error);
    assert_eq!(safe.mode, AnalysisMode::Safe);
    assert_eq!(safe.sample_rate, 22050);
    assert!(safe.methods_used.contains("baseline-decoder"));

    let advanced = advanced_analyzer().analyze(&path);
    assert!(advanced.is_ok());
    assert!(advanced.methods_used.contains("primary-decoder"));
}

#[test]
fn test_disabled_method_never_votes() {
    let config = samplescope::ConfigBuilder::new()
        .disable_method(samplescope::MethodId::FilenameKeywords)
        .build();
    let analyzer = SampleAnalyzer::with_profile(config, safe_analyzer().profile().clone());

    let samples = testgen::sine(60.0, 1.0, SR, 0.8);
    let result = analyzer.analyze_waveform("kick.wav", &testgen::waveform(samples, SR));
    assert!(!result.methods_used.contains("filename-keywords"));
    assert_eq!(result.category, Category::Bass);
}

#[test]
fn test_result_serializes_with_plain_labels() {
    let samples = testgen::decaying_hit(200.0, 0.8, SR, 0.1);
    let result = safe_analyzer().analyze_waveform("snare_01.wav", &testgen::waveform(samples, SR));
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();

    assert_eq!(json["category"], "Drums");
    assert_eq!(json["mode"], "safe");
    assert!(json["characteristics"]["band_energies"]["bass"].is_number());
}
