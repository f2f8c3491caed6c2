//! Aggregate analysis parameters, named tuning presets and TOML overrides.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::analysis::{
    BandConfig, OnsetConfig, PitchConfig, RippleConfig, SmootherConfig, REFERENCE_FPS,
};
use super::audio::{FrameConfig, SpectrumConfig};
use crate::error::{ConfigError, ConfigResult};

/// Named tunings of the analysis pipeline
///
/// `Standard` is peak picking with the harmonic-product fallback at the stock
/// thresholds. The others trade stability against responsiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TuningPreset {
    #[default]
    Standard,

    /// Lower noise floor and gates: picks up quiet or distant sources
    Sensitive,

    /// Higher noise floor and slower smoothing: steadier hue under noise
    Stable,
}

impl TuningPreset {
    pub const ALL: [TuningPreset; 3] = [Self::Standard, Self::Sensitive, Self::Stable];

    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Sensitive => "sensitive",
            Self::Stable => "stable",
        }
    }

    /// Parameters for this preset
    pub fn params(self) -> AnalysisParams {
        let mut params = AnalysisParams::default();
        match self {
            Self::Standard => {}
            Self::Sensitive => {
                params.pitch.noise_floor = 30.0;
                params.smoother.min_confidence = 0.01;
                params.onset.beat_threshold = 0.05;
                params.onset.min_level_rise = 0.03;
                params.onset.peak_threshold = 0.25;
                params.ripple.audio_level_gate = 0.005;
            }
            Self::Stable => {
                params.pitch.noise_floor = 70.0;
                params.smoother.min_confidence = 0.05;
                params.smoother.confidence_attack = 0.15;
                params.smoother.frequency_attack = 0.2;
                params.onset.average_ratio = 1.5;
                params.onset.beat_threshold = 0.15;
                params.spectrum.smoothing_time_constant = 0.85;
            }
        }
        params
    }
}

impl fmt::Display for TuningPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TuningPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownName {
                kind: "preset",
                name: s.to_string(),
            })
    }
}

/// All parameters of the analysis pipeline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisParams {
    pub spectrum: SpectrumConfig,
    pub frame: FrameConfig,
    pub bands: BandConfig,
    pub pitch: PitchConfig,
    pub smoother: SmootherConfig,
    pub onset: OnsetConfig,
    pub ripple: RippleConfig,
}

/// TOML overlay: every table and every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamsFile {
    preset: Option<String>,
    spectrum: Option<toml::Table>,
    frame: Option<toml::Table>,
    bands: Option<toml::Table>,
    pitch: Option<toml::Table>,
    smoother: Option<toml::Table>,
    onset: Option<toml::Table>,
    ripple: Option<toml::Table>,
}

/// Deserialize `overlay` on top of `base`, keeping base values for absent keys
fn overlay<T>(base: &mut T, overlay: Option<toml::Table>) -> ConfigResult<()>
where
    T: Serialize + DeserializeOwned,
{
    let Some(table) = overlay else {
        return Ok(());
    };
    let mut merged = match toml::Value::try_from(&*base)? {
        toml::Value::Table(merged) => merged,
        _ => toml::Table::new(),
    };
    merged.extend(table);
    *base = toml::Value::Table(merged).try_into()?;
    Ok(())
}

impl AnalysisParams {
    /// Parse a TOML tuning document
    ///
    /// The optional top-level `preset = "..."` key selects the starting point
    /// (falling back to `default_preset`); tables then override single keys.
    pub fn from_toml_str(text: &str, default_preset: TuningPreset) -> ConfigResult<Self> {
        let file: ParamsFile = toml::from_str(text)?;
        let preset = match file.preset.as_deref() {
            Some(name) => name.parse()?,
            None => default_preset,
        };
        let mut params = preset.params();
        overlay(&mut params.spectrum, file.spectrum)?;
        overlay(&mut params.frame, file.frame)?;
        overlay(&mut params.bands, file.bands)?;
        overlay(&mut params.pitch, file.pitch)?;
        overlay(&mut params.smoother, file.smoother)?;
        overlay(&mut params.onset, file.onset)?;
        overlay(&mut params.ripple, file.ripple)?;
        params.validate()?;
        debug!(%preset, "Loaded analysis parameters");
        Ok(params)
    }

    /// Read and parse a TOML tuning file
    pub fn load(path: &Path, default_preset: TuningPreset) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, default_preset)
    }

    /// Same parameters with every per-tick coefficient converted to
    /// `self.frame.fps` (defaults are tuned at [`REFERENCE_FPS`])
    ///
    /// Blend factors and retentions keep their continuous rate, tick counts
    /// keep their wall-clock length and ripple time steps scale linearly.
    pub fn retimed_for_frame_rate(mut self) -> Self {
        let fps = self.frame.fps.max(1) as f32;
        if (fps - REFERENCE_FPS).abs() > f32::EPSILON {
            self.spectrum.retime(REFERENCE_FPS, fps);
            self.smoother.retime(REFERENCE_FPS, fps);
            self.onset.retime(REFERENCE_FPS, fps);
            self.ripple.retime(REFERENCE_FPS, fps);
            debug!(fps, "Retimed per-tick coefficients");
        }
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.spectrum.validate()?;
        self.frame.validate()?;
        self.bands.validate()?;
        self.pitch.validate()?;
        self.smoother.validate()?;
        self.onset.validate()?;
        self.ripple.validate()?;
        Ok(())
    }
}
