//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;

use crate::core::capability::CapabilityProfile;
use crate::detection::{AnalysisResult, ConfidenceTier};

/// Totals over one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchStats {
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        let successful = results.iter().filter(|r| r.is_ok()).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        }
    }
}

/// Format one result for terminal output
pub fn format_result(result: &AnalysisResult, verbose: bool) -> String {
    let mut output = String::new();

    if let Some(err) = &result.error {
        output.push_str(&format!("{} {}\n", "✗".red(), result.file_path.clone().bold()));
        output.push_str(&format!("  {}\n", err.clone().red()));
        return output;
    }

    let tier = result.confidence_tier();
    let symbol = match tier {
        ConfidenceTier::High => tier.symbol().green(),
        ConfidenceTier::Medium => tier.symbol().yellow(),
        ConfidenceTier::Low => tier.symbol().red(),
    };
    output.push_str(&format!(
        "{} {} {}\n",
        symbol,
        result.file_path.clone().bold(),
        format!("[{} mode]", result.mode).dim()
    ));

    let bpm = if result.has_tempo() {
        format!("{:.1} BPM", result.bpm)
    } else {
        "no tempo".to_string()
    };
    output.push_str(&format!(
        "  {} | {} | {} | {} (confidence: {:.0}%)\n",
        result.sample_type.to_string().cyan(),
        result.category.to_string().cyan(),
        bpm,
        result.key,
        result.confidence * 100.0
    ));

    if verbose {
        let features = &result.characteristics;
        output.push_str(&format!(
            "  {}\n",
            format!(
                "{:.2}s @ {} Hz | centroid {:.0} Hz | rolloff {:.0} Hz | zcr {:.3} | dominant {:.1} Hz",
                result.duration,
                result.sample_rate,
                features.spectral_centroid,
                features.spectral_rolloff,
                features.zero_crossing_rate,
                features.dominant_frequency
            )
            .dim()
        ));
        let methods: Vec<&str> = result.methods_used.iter().map(String::as_str).collect();
        output.push_str(&format!("  {}\n", format!("methods: {}", methods.join(", ")).dim()));
    }

    output
}

pub fn print_report(results: &[AnalysisResult], verbose: bool) {
    for result in results {
        print!("{}", format_result(result, verbose));
    }

    let stats = BatchStats::from_results(results);
    println!();
    println!(
        "Processed {} file(s): {} successful, {}",
        stats.total,
        stats.successful.to_string().green(),
        if stats.failed > 0 {
            format!("{} failed", stats.failed).red().to_string()
        } else {
            "0 failed".to_string()
        }
    );
}

#[derive(Serialize)]
struct JsonReport<'a> {
    results: &'a [AnalysisResult],
    stats: BatchStats,
}

pub fn print_json(results: &[AnalysisResult]) -> anyhow::Result<()> {
    let report = JsonReport {
        results,
        stats: BatchStats::from_results(results),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn print_system_info(profile: &CapabilityProfile, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    println!("{}", "System capabilities".bold());
    for (name, value) in profile.summary() {
        let value = match value.as_str() {
            "true" => value.green().to_string(),
            "false" => value.red().to_string(),
            _ => value,
        };
        println!("  {:<20} {}", name, value);
    }
    Ok(())
}
