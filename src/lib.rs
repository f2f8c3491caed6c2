//! Tonescope library - audio analysis for a pitch- and beat-reactive visualizer
//!
//! Microphone or WAV input is reduced once per render tick to band energies,
//! a smoothed dominant pitch, beat/peak flashes and twelve tone-ripple
//! envelopes, published as an [`AnalysisFrame`] for the scenes and HUD.

pub mod analysis;
pub mod audio;
pub mod error;
pub mod hud;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod scene;

pub use error::{CaptureError, ConfigError};
pub use pipeline::{AnalysisFrame, AnalysisPipeline};
