// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use colorful::Colorful;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::core::{CapabilityProfile, SampleAnalyzer};

pub use args::Args;
pub use output::{format_result, print_json, print_report, print_system_info, BatchStats};

/// Extensions picked up when walking directories
pub const AUDIO_EXTENSIONS: [&str; 7] = ["wav", "flac", "mp3", "ogg", "m4a", "aac", "aiff"];

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand inputs into a sorted list of files.
///
/// Files named directly are kept whatever their extension, so that a bad
/// path still shows up as an error result.
pub fn collect_audio_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && has_audio_extension(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Run the CLI
pub fn run(args: Args) -> Result<()> {
    let profile = Arc::new(CapabilityProfile::detect_with(args.safe_mode));

    if args.system_info {
        return print_system_info(&profile, args.json);
    }

    let config = args.analysis_config()?;
    let analyzer = SampleAnalyzer::with_profile(config, Arc::clone(&profile));

    let files = collect_audio_files(&args.inputs);
    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }
    info!("Analyzing {} file(s) in {} mode", files.len(), profile.mode);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")?
            .progress_chars("=>-"),
    );
    if args.json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let results: Vec<_> = files
        .par_iter()
        .progress_with(pb.clone())
        .map(|path| analyzer.analyze(path))
        .collect();
    pb.finish_and_clear();

    if args.json {
        print_json(&results)
    } else {
        print_report(&results, args.verbose);
        Ok(())
    }
}
