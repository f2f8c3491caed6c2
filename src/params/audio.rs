//! Spectrum analysis and frame timing configuration.

use serde::{Deserialize, Serialize};

use super::analysis::retime_retention;
use crate::error::{ConfigError, ConfigResult};

/// FFT analysis configuration
///
/// The defaults reproduce a browser `AnalyserNode` created with 1024 bins and
/// a 0.8 smoothing time constant, so the byte-scaled spectrum and every
/// threshold downstream (noise floor 50, confidence / 255) keep their meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// FFT window size (must be power of 2); the spectrum has half as many bins
    pub fft_size: usize,

    /// Temporal smoothing of bin magnitudes between frames (0 = none, <1)
    pub smoothing_time_constant: f32,

    /// Magnitude (dB) mapped to spectrum value 0
    pub min_decibels: f32,

    /// Magnitude (dB) mapped to spectrum value 255
    pub max_decibels: f32,

    /// Smoothing of the RMS input level (0 = instantaneous)
    pub level_smoothing: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            level_smoothing: 0.0,
        }
    }
}

impl SpectrumConfig {
    /// Number of magnitude bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Convert frequency (Hz) to spectrum bin index for a given sample rate
    pub fn hz_to_bin(&self, hz: f32, sample_rate_hz: u32) -> usize {
        let nyquist = sample_rate_hz as f32 / 2.0;
        if nyquist <= 0.0 {
            return 0;
        }
        ((hz / nyquist) * self.bin_count() as f32) as usize
    }

    /// The spectrum refreshes and the level is measured once per tick, so both
    /// smoothing weights are per-tick retentions
    pub(super) fn retime(&mut self, from_fps: f32, to_fps: f32) {
        self.smoothing_time_constant =
            retime_retention(self.smoothing_time_constant, from_fps, to_fps);
        self.level_smoothing = retime_retention(self.level_smoothing, from_fps, to_fps);
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(ConfigError::Invalid(format!(
                "FFT size must be a power of 2 >= 32, got {}",
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(ConfigError::Invalid(format!(
                "smoothing_time_constant must be in [0, 1), got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(ConfigError::Invalid(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        if !(0.0..1.0).contains(&self.level_smoothing) {
            return Err(ConfigError::Invalid(format!(
                "level_smoothing must be in [0, 1), got {}",
                self.level_smoothing
            )));
        }
        Ok(())
    }
}

/// Render-tick pacing and capture warm-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Render ticks per second; every per-tick smoothing factor assumes this rate
    pub fps: u32,

    /// Delay between opening the microphone and the first analysed frame (ms)
    pub warmup_ms: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            warmup_ms: 400,
        }
    }
}

impl FrameConfig {
    /// Seconds between two render ticks
    pub fn frame_interval_s(&self) -> f32 {
        1.0 / self.fps.max(1) as f32
    }

    /// Samples of input consumed per tick at the given sample rate
    pub fn samples_per_frame(&self, sample_rate_hz: u32) -> usize {
        (sample_rate_hz / self.fps.max(1)).max(1) as usize
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.fps == 0 || self.fps > 1000 {
            return Err(ConfigError::Invalid(format!(
                "fps must be in 1..=1000, got {}",
                self.fps
            )));
        }
        Ok(())
    }
}
