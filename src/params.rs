//! Parameter definitions with units and documented semantics.
//!
//! All magic numbers of the analysis pipeline live here:
//! - Units (Hz, dB, spectrum units 0..255, per-tick factors)
//! - Documented ranges and meanings
//! - Validation, named presets and TOML overrides

mod analysis;
mod audio;
mod preset;

// Re-export all types
pub use analysis::{
    factor_to_rate, rate_to_factor, retime_factor, retime_retention, retime_ticks, BandConfig, OnsetConfig, PitchConfig,
    RippleConfig, SmootherConfig, REFERENCE_FPS,
};
pub use audio::{FrameConfig, SpectrumConfig};
pub use preset::{AnalysisParams, TuningPreset};
