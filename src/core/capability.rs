// src/core/capability.rs
//
// Host capability detection: processor identification, analysis mode
// selection and per-library availability probing.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::dsp::{FftProcessor, WindowType};

/// Environment variable that forces Safe mode when set to a truthy value
pub const SAFE_MODE_ENV: &str = "SAMPLESCOPE_SAFE_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuVendor {
    Intel,
    Amd,
    Unknown,
}

impl fmt::Display for CpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CpuVendor::Intel => "Intel",
            CpuVendor::Amd => "AMD",
            CpuVendor::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Analysis mode selected once per process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Scalar-only numerics, advanced methods disabled
    Safe,
    /// Vector-accelerated numerics and every available method
    Advanced,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Safe => f.write_str("safe"),
            AnalysisMode::Advanced => f.write_str("advanced"),
        }
    }
}

/// Optional library slots that can be independently absent or broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Symphonia decoding. Advanced mode pairs it with sinc resampling; the
    /// baseline path still decodes with it when available.
    PrimaryDecoder,
    TempoToolkit,
    AdvancedSpectral,
    MlToolkit,
    SafeFallback,
}

impl Capability {
    pub fn all() -> Vec<Self> {
        vec![
            Self::PrimaryDecoder,
            Self::TempoToolkit,
            Self::AdvancedSpectral,
            Self::MlToolkit,
            Self::SafeFallback,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PrimaryDecoder => "primary-decoder",
            Self::TempoToolkit => "tempo-toolkit",
            Self::AdvancedSpectral => "advanced-spectral",
            Self::MlToolkit => "ml-toolkit",
            Self::SafeFallback => "safe-fallback",
        }
    }

    /// Whether the slot's full path is only usable in Advanced mode
    pub fn requires_advanced(&self) -> bool {
        matches!(self, Self::PrimaryDecoder | Self::AdvancedSpectral)
    }
}

/// Where the processor identification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CpuSource {
    Cpuid,
    ProcCpuinfo,
    Unavailable,
}

/// Raw processor identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub vendor_id: String,
    pub brand: String,
    pub has_avx: bool,
    pub source: CpuSource,
}

impl CpuInfo {
    pub fn unknown() -> Self {
        Self {
            vendor_id: String::new(),
            brand: String::new(),
            has_avx: false,
            source: CpuSource::Unavailable,
        }
    }

    /// Identify the host processor: CPUID first, then /proc/cpuinfo
    pub fn probe() -> Self {
        if let Some(info) = Self::from_cpuid() {
            return info;
        }
        if let Some(info) = Self::from_proc_cpuinfo() {
            return info;
        }
        debug!("No processor identification source available");
        Self::unknown()
    }

    pub fn vendor(&self) -> CpuVendor {
        let brand = self.brand.to_lowercase();
        let vendor_id = self.vendor_id.to_lowercase();
        if brand.contains("intel") || vendor_id.contains("genuineintel") {
            CpuVendor::Intel
        } else if brand.contains("amd") || vendor_id.contains("authenticamd") {
            CpuVendor::Amd
        } else {
            CpuVendor::Unknown
        }
    }

    #[cfg(target_arch = "x86_64")]
    fn from_cpuid() -> Option<Self> {
        use std::arch::x86_64::__cpuid;

        fn push_le(out: &mut Vec<u8>, reg: u32) {
            out.extend_from_slice(&reg.to_le_bytes());
        }

        #[allow(unused_unsafe)]
        let (vendor_id, brand) = unsafe {
            let leaf0 = __cpuid(0);
            let mut vendor = Vec::with_capacity(12);
            push_le(&mut vendor, leaf0.ebx);
            push_le(&mut vendor, leaf0.edx);
            push_le(&mut vendor, leaf0.ecx);

            let mut brand = Vec::with_capacity(48);
            if __cpuid(0x8000_0000).eax >= 0x8000_0004 {
                for leaf in 0x8000_0002u32..=0x8000_0004 {
                    let r = __cpuid(leaf);
                    push_le(&mut brand, r.eax);
                    push_le(&mut brand, r.ebx);
                    push_le(&mut brand, r.ecx);
                    push_le(&mut brand, r.edx);
                }
            }
            (vendor, brand)
        };

        let clean = |bytes: &[u8]| {
            String::from_utf8_lossy(bytes)
                .trim_matches(char::from(0))
                .trim()
                .to_string()
        };

        let vendor_id = clean(&vendor_id);
        if vendor_id.is_empty() {
            return None;
        }

        Some(Self {
            vendor_id,
            brand: clean(&brand),
            has_avx: std::arch::is_x86_feature_detected!("avx"),
            source: CpuSource::Cpuid,
        })
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn from_cpuid() -> Option<Self> {
        None
    }

    fn from_proc_cpuinfo() -> Option<Self> {
        let text = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        Self::parse_cpuinfo(&text)
    }

    /// Parse the first processor block of a /proc/cpuinfo dump
    pub fn parse_cpuinfo(text: &str) -> Option<Self> {
        let mut vendor_id = String::new();
        let mut brand = String::new();
        let mut has_avx = false;

        for line in text.lines() {
            if line.trim().is_empty() && !vendor_id.is_empty() {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "vendor_id" => vendor_id = value.to_string(),
                "model name" => brand = value.to_string(),
                "flags" => has_avx = value.split_whitespace().any(|f| f == "avx"),
                _ => {}
            }
        }

        if vendor_id.is_empty() && brand.is_empty() {
            return None;
        }

        Some(Self {
            vendor_id,
            brand,
            has_avx,
            source: CpuSource::ProcCpuinfo,
        })
    }
}

/// Advanced iff the processor is Intel with AVX and Safe mode is not forced
pub fn select_mode(vendor: CpuVendor, has_avx: bool, force_safe: bool) -> AnalysisMode {
    if !force_safe && vendor == CpuVendor::Intel && has_avx {
        AnalysisMode::Advanced
    } else {
        AnalysisMode::Safe
    }
}

/// Whether the Safe-mode environment override is set
pub fn env_forces_safe_mode() -> bool {
    std::env::var(SAFE_MODE_ENV)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Host capability matrix, computed once and shared read-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    pub vendor: CpuVendor,
    pub supports_vector_math: bool,
    pub mode: AnalysisMode,
    pub method_availability: BTreeMap<Capability, bool>,
    pub cpu: CpuInfo,
}

impl CapabilityProfile {
    /// Detect the host profile, honouring the Safe-mode environment override
    pub fn detect() -> Self {
        Self::detect_with(env_forces_safe_mode())
    }

    pub fn detect_with(force_safe: bool) -> Self {
        let profile = Self::from_cpu(CpuInfo::probe(), force_safe);
        info!(
            "Detected {} CPU ({}) - using {} mode",
            profile.vendor,
            if profile.cpu.brand.is_empty() { "unidentified" } else { &profile.cpu.brand },
            profile.mode
        );
        profile
    }

    /// Build a profile from a known processor identification and probe
    /// every optional library slot
    pub fn from_cpu(cpu: CpuInfo, force_safe: bool) -> Self {
        let vendor = cpu.vendor();
        let supports_vector_math = vendor == CpuVendor::Intel && cpu.has_avx;
        let mode = select_mode(vendor, cpu.has_avx, force_safe);

        let method_availability = Capability::all()
            .into_iter()
            .map(|cap| (cap, probe_capability(cap, mode)))
            .collect();

        Self {
            vendor,
            supports_vector_math,
            mode,
            method_availability,
            cpu,
        }
    }

    /// Conservative profile that never touches vectorized kernels
    pub fn safe() -> Self {
        Self::from_cpu(CpuInfo::unknown(), true)
    }

    /// Copy of this profile with a different mode; availability is kept
    pub fn with_mode(&self, mode: AnalysisMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Raw probe outcome, independent of mode
    pub fn is_available(&self, cap: Capability) -> bool {
        cap == Capability::SafeFallback || self.method_availability.get(&cap).copied().unwrap_or(false)
    }

    /// Whether a capability may be used under the current mode
    pub fn allows(&self, cap: Capability) -> bool {
        if cap == Capability::SafeFallback {
            return true;
        }
        if cap.requires_advanced() && self.mode != AnalysisMode::Advanced {
            return false;
        }
        self.is_available(cap)
    }

    /// Whether FFTs may use the SIMD-dispatching planner
    pub fn use_simd_fft(&self) -> bool {
        self.mode == AnalysisMode::Advanced
    }

    pub fn is_safe_mode(&self) -> bool {
        self.mode == AnalysisMode::Safe
    }

    /// Human-readable summary lines for system information output
    pub fn summary(&self) -> Vec<(String, String)> {
        let mut lines = vec![
            ("cpu_vendor".to_string(), self.vendor.to_string()),
            ("cpu_brand".to_string(), self.cpu.brand.clone()),
            ("cpu_source".to_string(), format!("{:?}", self.cpu.source)),
            ("avx".to_string(), self.cpu.has_avx.to_string()),
            ("mode".to_string(), self.mode.to_string()),
        ];
        for cap in Capability::all() {
            lines.push((cap.name().to_string(), self.allows(cap).to_string()));
        }
        lines
    }
}

fn probe_capability(cap: Capability, mode: AnalysisMode) -> bool {
    let result = catch_unwind(AssertUnwindSafe(|| match cap {
        Capability::PrimaryDecoder => probe_primary_decoder(),
        Capability::TempoToolkit => probe_tempo_toolkit(),
        Capability::AdvancedSpectral => probe_advanced_spectral(mode),
        Capability::MlToolkit => cfg!(feature = "ml-toolkit"),
        Capability::SafeFallback => true,
    }));

    match result {
        Ok(available) => {
            debug!("Capability {}: {}", cap.name(), available);
            available
        }
        Err(_) => {
            warn!("Capability probe for {} panicked; marking unavailable", cap.name());
            false
        }
    }
}

#[cfg(feature = "primary-decoder")]
fn probe_primary_decoder() -> bool {
    use rubato::{SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    // Registries must be constructible and a small resampler must initialize
    let _ = symphonia::default::get_probe();
    let _ = symphonia::default::get_codecs();

    let params = SincInterpolationParameters {
        sinc_len: 32,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 16,
        window: WindowFunction::BlackmanHarris2,
    };
    match SincFixedIn::<f32>::new(0.5, 1.0, params, 64, 1) {
        Ok(_) => true,
        Err(e) => {
            warn!("Primary decoder resampler unavailable: {}", e);
            false
        }
    }
}

#[cfg(not(feature = "primary-decoder"))]
fn probe_primary_decoder() -> bool {
    false
}

#[cfg(feature = "tempo-toolkit")]
fn probe_tempo_toolkit() -> bool {
    use super::analysis::toolkit::OnsetTracker;

    match OnsetTracker::new(1024, 512, 22050, false) {
        Ok(mut tracker) => {
            tracker.process(&[0.0; 1024]);
            true
        }
        Err(e) => {
            warn!("Tempo toolkit unavailable: {}", e);
            false
        }
    }
}

#[cfg(not(feature = "tempo-toolkit"))]
fn probe_tempo_toolkit() -> bool {
    false
}

fn probe_advanced_spectral(mode: AnalysisMode) -> bool {
    let mut processor = FftProcessor::new(256, WindowType::Hann, mode == AnalysisMode::Advanced);
    let spectrum = processor.magnitude_spectrum(&[0.25; 256]);
    spectrum.len() == 129 && spectrum.iter().all(|m| m.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(vendor_id: &str, brand: &str, has_avx: bool) -> CpuInfo {
        CpuInfo {
            vendor_id: vendor_id.to_string(),
            brand: brand.to_string(),
            has_avx,
            source: CpuSource::Cpuid,
        }
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(select_mode(CpuVendor::Intel, true, false), AnalysisMode::Advanced);
        assert_eq!(select_mode(CpuVendor::Intel, false, false), AnalysisMode::Safe);
        assert_eq!(select_mode(CpuVendor::Amd, true, false), AnalysisMode::Safe);
        assert_eq!(select_mode(CpuVendor::Unknown, true, false), AnalysisMode::Safe);
        assert_eq!(select_mode(CpuVendor::Intel, true, true), AnalysisMode::Safe);
    }

    #[test]
    fn test_vendor_from_brand_or_vendor_id() {
        assert_eq!(cpu("GenuineIntel", "", true).vendor(), CpuVendor::Intel);
        assert_eq!(cpu("", "Intel(R) Core(TM) i7", true).vendor(), CpuVendor::Intel);
        assert_eq!(cpu("AuthenticAMD", "AMD Ryzen 9", true).vendor(), CpuVendor::Amd);
        assert_eq!(cpu("ARM", "Cortex", false).vendor(), CpuVendor::Unknown);
    }

    #[test]
    fn test_amd_profile_is_safe() {
        let profile = CapabilityProfile::from_cpu(cpu("AuthenticAMD", "AMD Ryzen 7", true), false);
        assert_eq!(profile.mode, AnalysisMode::Safe);
        assert!(!profile.supports_vector_math);
        assert!(!profile.allows(Capability::AdvancedSpectral));
        assert!(!profile.allows(Capability::PrimaryDecoder));
        assert!(profile.allows(Capability::SafeFallback));
        assert!(!profile.use_simd_fft());
    }

    #[test]
    fn test_intel_avx_profile_is_advanced() {
        let profile = CapabilityProfile::from_cpu(cpu("GenuineIntel", "Intel Xeon", true), false);
        assert_eq!(profile.mode, AnalysisMode::Advanced);
        assert!(profile.allows(Capability::AdvancedSpectral));
        assert_eq!(
            profile.allows(Capability::PrimaryDecoder),
            cfg!(feature = "primary-decoder")
        );
    }

    #[test]
    fn test_with_mode_keeps_availability() {
        let profile = CapabilityProfile::safe();
        let advanced = profile.with_mode(AnalysisMode::Advanced);
        assert_eq!(advanced.method_availability, profile.method_availability);
        assert_eq!(advanced.mode, AnalysisMode::Advanced);
    }

    #[test]
    fn test_detect_is_idempotent() {
        assert_eq!(CapabilityProfile::detect_with(true), CapabilityProfile::detect_with(true));
    }

    #[test]
    fn test_parse_cpuinfo() {
        let text = "processor\t: 0\nvendor_id\t: AuthenticAMD\nmodel name\t: AMD EPYC 7B13\nflags\t\t: fpu sse avx2 avx\n\nprocessor\t: 1\nvendor_id\t: Other\n";
        let info = CpuInfo::parse_cpuinfo(text).unwrap();
        assert_eq!(info.vendor_id, "AuthenticAMD");
        assert_eq!(info.brand, "AMD EPYC 7B13");
        assert!(info.has_avx);
        assert_eq!(info.source, CpuSource::ProcCpuinfo);

        // avx2 alone is not the avx flag
        let no_avx = CpuInfo::parse_cpuinfo("vendor_id : GenuineIntel\nflags : sse avx2\n").unwrap();
        assert!(!no_avx.has_avx);
        assert!(CpuInfo::parse_cpuinfo("").is_none());
    }
}
