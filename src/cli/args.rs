//! CLI argument parsing

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;

use crate::config::{AnalysisConfig, ConfigBuilder, MethodId};
use crate::core::capability::SAFE_MODE_ENV;

#[derive(Parser, Debug)]
#[command(name = "samplescope")]
#[command(version)]
#[command(about = "Classify audio samples: one-shot or loop, category, tempo and key")]
pub struct Args {
    /// Audio files or directories to analyze
    #[arg(required_unless_present = "system_info")]
    pub inputs: Vec<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Force Safe mode (scalar kernels only)
    #[arg(long, env = SAFE_MODE_ENV, value_parser = BoolishValueParser::new())]
    pub safe_mode: bool,

    /// Sample rate every file is resampled to
    #[arg(long, value_name = "HZ")]
    pub target_rate: Option<u32>,

    /// Exclude an estimator from voting (can repeat)
    #[arg(long = "disable", value_name = "METHOD")]
    pub disabled: Vec<String>,

    /// JSON file with analysis settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug logging and per-file feature details
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the detected capability profile and exit
    #[arg(long)]
    pub system_info: bool,
}

impl Args {
    /// Analysis configuration from the config file and flag overrides
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let base = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => AnalysisConfig::default(),
        };

        let mut builder = ConfigBuilder::from_config(base);
        if let Some(rate) = self.target_rate {
            builder = builder.target_sample_rate(rate);
        }
        for name in &self.disabled {
            match MethodId::from_name(name) {
                Some(method) => builder = builder.disable_method(method),
                None => bail!(
                    "Unknown method '{}'. Known methods: {}",
                    name,
                    MethodId::all().iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
                ),
            }
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_reach_config() {
        let args = Args::try_parse_from([
            "samplescope",
            "--target-rate",
            "44100",
            "--disable",
            "chroma-profile",
            "a.wav",
        ])
        .unwrap();
        let config = args.analysis_config().unwrap();
        assert_eq!(config.target_sample_rate, 44100);
        assert!(!config.is_method_enabled(MethodId::ChromaProfile));
        assert_eq!(args.inputs, vec![PathBuf::from("a.wav")]);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let args = Args::try_parse_from(["samplescope", "--disable", "magic", "a.wav"]).unwrap();
        assert!(args.analysis_config().is_err());
    }

    #[test]
    fn test_zeroed_config_file_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"target_sample_rate": 0, "stft_size": 0}"#).unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let args = Args::try_parse_from(["samplescope", "--config", path_arg.as_str(), "a.wav"]).unwrap();
        let config = args.analysis_config().unwrap();
        assert_eq!(config.target_sample_rate, 8000);
        assert_eq!(config.stft_size, 256);
        assert_eq!(config.hop_length, 512);
    }

    #[test]
    fn test_system_info_needs_no_inputs() {
        assert!(Args::try_parse_from(["samplescope", "--system-info"]).is_ok());
        assert!(Args::try_parse_from(["samplescope"]).is_err());
    }
}
