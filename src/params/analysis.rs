//! Feature-extraction thresholds and per-tick smoothing coefficients.
//!
//! Every `*_factor` / `*_rate` below is a first-order IIR coefficient applied
//! once per render tick (`x += (target - x) * factor`). They are tuned for the
//! reference tick rate; use [`retime_factor`] when running at another rate.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Tick rate the default coefficients were tuned at
pub const REFERENCE_FPS: f32 = 60.0;

/// Convert a per-tick factor to a continuous decay rate (1/s)
///
/// `rate = -ln(1 - factor) / frame_interval`
pub fn factor_to_rate(factor: f32, frame_interval_s: f32) -> f32 {
    let factor = factor.clamp(0.0, 0.999_999);
    -(1.0 - factor).ln() / frame_interval_s.max(f32::EPSILON)
}

/// Convert a continuous decay rate (1/s) back to a per-tick factor
pub fn rate_to_factor(rate: f32, frame_interval_s: f32) -> f32 {
    1.0 - (-rate * frame_interval_s).exp()
}

/// Re-express a per-tick factor tuned at `from_fps` for a tick rate of `to_fps`
pub fn retime_factor(factor: f32, from_fps: f32, to_fps: f32) -> f32 {
    rate_to_factor(factor_to_rate(factor, 1.0 / from_fps), 1.0 / to_fps)
}

/// Re-express a per-tick retention (`x = x * retention + new * (1 - retention)`)
/// tuned at `from_fps` for a tick rate of `to_fps`
///
/// Same continuous rate as [`retime_factor`] applied to `1 - retention`;
/// a retention of 0 stays 0.
pub fn retime_retention(retention: f32, from_fps: f32, to_fps: f32) -> f32 {
    retention.clamp(0.0, 1.0).powf(from_fps / to_fps)
}

/// Re-express a duration counted in ticks at `from_fps` as ticks at `to_fps`
/// (rounded, at least 1)
pub fn retime_ticks(ticks: usize, from_fps: f32, to_fps: f32) -> usize {
    ((ticks as f32 * to_fps / from_fps).round() as usize).max(1)
}

fn check_factor(name: &str, value: f32) -> ConfigResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}

fn check_range(name: &str, range: (f32, f32)) -> ConfigResult<()> {
    if range.0 >= 0.0 && range.0 < range.1 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be an increasing non-negative range, got {range:?}"
        )))
    }
}

/// Frequency band partition for low/mid/high energy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// Bass range (Hz)
    pub low_range_hz: (f32, f32),

    /// Mid range (Hz)
    pub mid_range_hz: (f32, f32),

    /// High range (Hz)
    pub high_range_hz: (f32, f32),

    /// Gain applied to high-band energy before clamping to 255
    /// (high bins carry little magnitude in a byte-scaled spectrum)
    pub high_gain: f32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            low_range_hz: (20.0, 140.0),
            mid_range_hz: (140.0, 2000.0),
            high_range_hz: (2000.0, 16000.0),
            high_gain: 3.5,
        }
    }
}

impl BandConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("low_range_hz", self.low_range_hz)?;
        check_range("mid_range_hz", self.mid_range_hz)?;
        check_range("high_range_hz", self.high_range_hz)?;
        if !(self.high_gain > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "high_gain must be positive, got {}",
                self.high_gain
            )));
        }
        Ok(())
    }
}

/// Dominant-pitch search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    /// Peak-picking search range (Hz)
    pub search_range_hz: (f32, f32),

    /// Minimum peak magnitude (spectrum units, 0..255) to report a pitch
    pub noise_floor: f32,

    /// Confidence at or below which the harmonic-product fallback is tried
    pub fallback_confidence: f32,

    /// Candidate fundamental range for the harmonic-product fallback (Hz)
    pub hps_range_hz: (f32, f32),

    /// Number of harmonics multiplied together (1x..Nx)
    pub hps_harmonics: usize,

    /// Minimum harmonic product to accept a fallback candidate
    pub hps_threshold: f32,

    /// Concert pitch reference for note naming (Hz)
    pub a4_hz: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            search_range_hz: (60.0, 1200.0),
            noise_floor: 50.0,
            fallback_confidence: 0.02,
            hps_range_hz: (80.0, 2000.0),
            hps_harmonics: 4,
            hps_threshold: 0.01,
            a4_hz: 440.0,
        }
    }
}

impl PitchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("search_range_hz", self.search_range_hz)?;
        check_range("hps_range_hz", self.hps_range_hz)?;
        if !(0.0..=255.0).contains(&self.noise_floor) {
            return Err(ConfigError::Invalid(format!(
                "noise_floor must be in [0, 255], got {}",
                self.noise_floor
            )));
        }
        if self.hps_harmonics == 0 {
            return Err(ConfigError::Invalid("hps_harmonics must be >= 1".into()));
        }
        if !(self.a4_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "a4_hz must be positive, got {}",
                self.a4_hz
            )));
        }
        Ok(())
    }
}

/// Pitch smoothing and gating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    /// Raw estimates at or below this frequency count as "no pitch" (Hz)
    pub min_frequency_hz: f32,

    /// Raw estimates at or below this confidence count as "no pitch"
    pub min_confidence: f32,

    /// Blend factor toward a confident raw confidence
    pub confidence_attack: f32,

    /// Blend factor toward a confident raw frequency
    pub frequency_attack: f32,

    /// Decay factor of confidence while no pitch is detected
    pub confidence_release: f32,

    /// Decay factor of smoothed frequency while no pitch is detected
    pub frequency_release: f32,

    /// Decay factor of hue toward `rest_hue` while no pitch is detected
    pub hue_release: f32,

    /// Hue (degrees) drifted to in silence
    pub rest_hue: f32,

    /// Hue range (degrees) used when a frequency maps to no note
    pub fallback_hue_range: (f32, f32),

    /// Smoothed frequencies below this snap to 0 while decaying (Hz);
    /// defaults to the gate frequency so silence settles within ~30 ticks
    pub rest_frequency_hz: f32,

    /// Confidences below this snap to 0 while decaying
    pub rest_confidence: f32,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            min_frequency_hz: 40.0,
            min_confidence: 0.02,
            confidence_attack: 0.3,
            frequency_attack: 0.4,
            confidence_release: 0.12,
            frequency_release: 0.12,
            hue_release: 0.1,
            rest_hue: 220.0,
            fallback_hue_range: (200.0, 360.0),
            rest_frequency_hz: 40.0,
            rest_confidence: 0.005,
        }
    }
}

impl SmootherConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        check_factor("confidence_attack", self.confidence_attack)?;
        check_factor("frequency_attack", self.frequency_attack)?;
        check_factor("confidence_release", self.confidence_release)?;
        check_factor("frequency_release", self.frequency_release)?;
        check_factor("hue_release", self.hue_release)?;
        check_range("fallback_hue_range", self.fallback_hue_range)?;
        Ok(())
    }

    pub(super) fn retime(&mut self, from_fps: f32, to_fps: f32) {
        for factor in [
            &mut self.confidence_attack,
            &mut self.frequency_attack,
            &mut self.confidence_release,
            &mut self.frequency_release,
            &mut self.hue_release,
        ] {
            *factor = retime_factor(*factor, from_fps, to_fps);
        }
    }
}

/// Beat and spectral-peak detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    /// Number of recent levels averaged for beat detection
    pub history_size: usize,

    /// Absolute minimum level for a beat
    pub beat_threshold: f32,

    /// Minimum level rise since the previous frame for a beat
    pub min_level_rise: f32,

    /// Level must exceed the history average by this ratio for a beat
    pub average_ratio: f32,

    /// Per-tick decay of the beat flash
    pub beat_decay: f32,

    /// Per-tick decay of the peak flash
    pub peak_decay: f32,

    /// Frequency range (Hz) whose mean energy feeds the peak detector
    pub peak_range_hz: (f32, f32),

    /// Minimum normalised energy (0..1) for a spectral peak
    pub peak_threshold: f32,

    /// After a peak, the cutoff is raised to energy * this
    pub peak_cutoff_mult: f32,

    /// Per-tick cutoff multiplier once `frames_per_peak` have elapsed
    pub peak_cutoff_decay: f32,

    /// Frames the raised cutoff is held after a peak
    pub frames_per_peak: u32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            history_size: 20,
            beat_threshold: 0.1,
            min_level_rise: 0.05,
            average_ratio: 1.3,
            beat_decay: 0.12,
            peak_decay: 0.15,
            peak_range_hz: (40.0, 20000.0),
            peak_threshold: 0.35,
            peak_cutoff_mult: 1.5,
            peak_cutoff_decay: 0.95,
            frames_per_peak: 20,
        }
    }
}

impl OnsetConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.history_size == 0 {
            return Err(ConfigError::Invalid("history_size must be >= 1".into()));
        }
        check_factor("beat_decay", self.beat_decay)?;
        check_factor("peak_decay", self.peak_decay)?;
        check_factor("peak_cutoff_decay", self.peak_cutoff_decay)?;
        check_range("peak_range_hz", self.peak_range_hz)?;
        Ok(())
    }

    pub(super) fn retime(&mut self, from_fps: f32, to_fps: f32) {
        self.beat_decay = retime_factor(self.beat_decay, from_fps, to_fps);
        self.peak_decay = retime_factor(self.peak_decay, from_fps, to_fps);
        self.peak_cutoff_decay = retime_retention(self.peak_cutoff_decay, from_fps, to_fps);
        self.history_size = retime_ticks(self.history_size, from_fps, to_fps);
        self.frames_per_peak = retime_ticks(self.frames_per_peak as usize, from_fps, to_fps)
            .try_into()
            .unwrap_or(u32::MAX);
    }
}

/// Twelve-channel tone ripple envelopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleConfig {
    /// Input level above which audio counts as present
    pub audio_level_gate: f32,

    /// Resting amplitude shared by all channels
    pub base_amplitude: f32,

    /// Sinusoidal variation of the resting amplitude across channels
    pub base_variation: f32,

    /// Phase step (radians) between neighbouring channels' resting amplitudes
    pub base_phase_step: f32,

    /// Per-tick blend toward a higher target
    pub attack: f32,

    /// Per-tick blend toward a lower target
    pub release_rate: f32,

    /// A target above base * this starts a new ripple
    pub active_ratio: f32,

    /// A releasing ripple within this distance of its base goes idle
    pub rest_tolerance: f32,

    /// Input level range mapped onto `boost_range`
    pub boost_level_range: (f32, f32),

    /// Amplitude boost range added to the dominant channel's target
    pub boost_range: (f32, f32),

    /// Ripple time advance per tick while active
    pub active_time_step: f32,

    /// Ripple time advance per tick while idle
    pub idle_time_step: f32,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            audio_level_gate: 0.01,
            base_amplitude: 0.2,
            base_variation: 0.08,
            base_phase_step: 0.5,
            attack: 0.15,
            release_rate: 0.02,
            active_ratio: 1.1,
            rest_tolerance: 0.05,
            boost_level_range: (0.0, 0.3),
            boost_range: (0.4, 1.2),
            active_time_step: 0.25,
            idle_time_step: 0.08,
        }
    }
}

impl RippleConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        check_factor("attack", self.attack)?;
        check_factor("release_rate", self.release_rate)?;
        check_range("boost_level_range", self.boost_level_range)?;
        if self.base_amplitude - self.base_variation.abs() <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "base_amplitude ({}) must exceed base_variation ({})",
                self.base_amplitude, self.base_variation
            )));
        }
        Ok(())
    }

    pub(super) fn retime(&mut self, from_fps: f32, to_fps: f32) {
        let scale = from_fps / to_fps;
        self.attack = retime_factor(self.attack, from_fps, to_fps);
        self.release_rate = retime_factor(self.release_rate, from_fps, to_fps);
        self.active_time_step *= scale;
        self.idle_time_step *= scale;
    }
}
