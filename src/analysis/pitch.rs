//! Dominant-pitch estimation from a single spectrum.
//!
//! Peak picking over 60-1200 Hz gives a frequency and a confidence (peak
//! height above the band mean). When that is absent or weak, a harmonic
//! product spectrum over 80-2000 Hz is tried instead. No state is kept
//! between frames; gating "no pitch" is the smoother's job.

use std::fmt;

use crate::audio::SPECTRUM_MAX;
use crate::params::PitchConfig;

/// Pitch class names, index 0 = C
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Floor for normalised magnitudes inside the log-product
const MIN_MAGNITUDE: f32 = 1e-6;

/// Raw, unsmoothed pitch estimate
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PitchEstimate {
    pub frequency_hz: f32,
    pub confidence: f32,
}

impl PitchEstimate {
    /// No pitch found
    pub const NONE: PitchEstimate = PitchEstimate {
        frequency_hz: 0.0,
        confidence: 0.0,
    };
}

/// Nearest equal-tempered note of a frequency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Note {
    /// Pitch class, 0 (C) ..= 11 (B)
    pub index: usize,
    pub octave: i32,
}

impl Note {
    pub fn pitch_class(&self) -> &'static str {
        NOTE_NAMES[self.index]
    }

    /// Scientific pitch name, e.g. "A4"
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class(), self.octave)
    }
}

/// Nearest note to `frequency_hz` relative to `a4_hz`
///
/// `n = round(12 * log2(f / a4))`, pitch class `(n + 69) mod 12`, octave
/// `floor((n + 69) / 12) - 1`, with halves rounding toward +inf. Non-positive
/// or non-finite input has no note.
pub fn freq_to_note(frequency_hz: f32, a4_hz: f32) -> Option<Note> {
    if !(frequency_hz > 0.0) || !frequency_hz.is_finite() || !(a4_hz > 0.0) {
        return None;
    }
    let n = 12.0 * (f64::from(frequency_hz) / f64::from(a4_hz)).log2();
    let n_rounded = (n + 0.5).floor() as i64;
    let midi = n_rounded + 69;

    Some(Note {
        index: midi.rem_euclid(12) as usize,
        octave: (midi.div_euclid(12) - 1) as i32,
    })
}

/// Finds the dominant fundamental of a spectrum
#[derive(Debug, Clone)]
pub struct PitchEstimator {
    config: PitchConfig,
}

impl PitchEstimator {
    pub fn new(config: PitchConfig) -> Self {
        Self { config }
    }

    /// Best raw guess for the current spectrum
    pub fn estimate(&self, spectrum: &[f32], sample_rate: u32) -> PitchEstimate {
        let nyquist = sample_rate as f32 / 2.0;
        let primary = self.estimate_peak(spectrum, nyquist);
        if primary.frequency_hz > 0.0 && primary.confidence > self.config.fallback_confidence {
            return primary;
        }

        let fallback = self.estimate_hps(spectrum, nyquist);
        if fallback.confidence > primary.confidence {
            fallback
        } else {
            primary
        }
    }

    /// Peak picking: highest bin in the search range, confidence from its
    /// height above the range mean
    pub fn estimate_peak(&self, spectrum: &[f32], nyquist: f32) -> PitchEstimate {
        let Some((start, end)) = bin_range(spectrum.len(), nyquist, self.config.search_range_hz)
        else {
            return PitchEstimate::NONE;
        };

        let mut max_val = 0.0f32;
        let mut max_index = 0usize;
        let mut sum = 0.0f32;
        for (i, &raw) in spectrum.iter().enumerate().take(end).skip(start) {
            let val = sanitize(raw);
            sum += val;
            if val > max_val {
                max_val = val;
                max_index = i;
            }
        }

        if max_val < self.config.noise_floor {
            return PitchEstimate::NONE;
        }

        let avg = sum / (end - start) as f32;
        let confidence = if avg > 0.0 {
            (max_val - avg) / SPECTRUM_MAX
        } else {
            max_val / SPECTRUM_MAX
        };

        PitchEstimate {
            frequency_hz: (max_index as f32 / spectrum.len() as f32) * nyquist,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Harmonic product spectrum: the candidate whose 1x..Nx harmonics have
    /// the largest product of normalised magnitudes
    pub fn estimate_hps(&self, spectrum: &[f32], nyquist: f32) -> PitchEstimate {
        let Some((start, end)) = bin_range(spectrum.len(), nyquist, self.config.hps_range_hz)
        else {
            return PitchEstimate::NONE;
        };
        let harmonics = self.config.hps_harmonics.max(1);
        let normalized = |i: usize| (sanitize(spectrum[i]) / SPECTRUM_MAX).clamp(0.0, 1.0);

        let mut best_log = f32::NEG_INFINITY;
        let mut best_bin = 0usize;
        let mut band_sum = 0.0f32;

        // Bin 0 is DC and every multiple of it is DC
        for k in start.max(1)..end {
            band_sum += normalized(k);
            let log_product: f32 = (1..=harmonics)
                .map(|h| k * h)
                .take_while(|&idx| idx < spectrum.len())
                .map(|idx| normalized(idx).max(MIN_MAGNITUDE).ln())
                .sum();
            if log_product > best_log {
                best_log = log_product;
                best_bin = k;
            }
        }

        let max_hps = best_log.exp();
        if !(max_hps > self.config.hps_threshold) {
            return PitchEstimate::NONE;
        }

        let band_len = end - start.max(1);
        let band_mean = band_sum / band_len.max(1) as f32;
        let confidence = max_hps.powf(1.0 / harmonics as f32) - band_mean;

        PitchEstimate {
            frequency_hz: (best_bin as f32 / spectrum.len() as f32) * nyquist,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Note of a frequency using this estimator's tuning reference
    pub fn note_for(&self, frequency_hz: f32) -> Option<Note> {
        freq_to_note(frequency_hz, self.config.a4_hz)
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Bin indices `floor(lo/bin_hz) .. min(floor(hi/bin_hz), len)`, or `None` when empty
fn bin_range(len: usize, nyquist: f32, (lo, hi): (f32, f32)) -> Option<(usize, usize)> {
    if len == 0 || !(nyquist > 0.0) {
        return None;
    }
    let bin_hz = nyquist / len as f32;
    let start = (lo / bin_hz).floor().max(0.0) as usize;
    let end = ((hi / bin_hz).floor().max(0.0) as usize).min(len);
    (start < end).then_some((start, end))
}
