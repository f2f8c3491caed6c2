//! Spectral peak detection: a framed-energy comparator with an adaptive cutoff.
//!
//! Each frame the mean spectrum energy over a frequency range (normalised to
//! 0..1) is compared against a cutoff. A peak raises the cutoff to
//! `energy * cutoff_mult`; the cutoff is held for `frames_per_peak` frames and
//! then decays back toward the fixed threshold.

use tracing::trace;

use crate::audio::{band_energy, SPECTRUM_MAX};
use crate::params::OnsetConfig;

#[derive(Debug, Clone)]
pub struct PeakDetector {
    range_hz: (f32, f32),
    threshold: f32,
    cutoff_mult: f32,
    cutoff_decay: f32,
    frames_per_peak: u32,

    cutoff: f32,
    frames_since_peak: u32,
    previous_energy: f32,
    is_detected: bool,
}

impl PeakDetector {
    pub fn new(config: &OnsetConfig) -> Self {
        Self {
            range_hz: config.peak_range_hz,
            threshold: config.peak_threshold,
            cutoff_mult: config.peak_cutoff_mult,
            cutoff_decay: config.peak_cutoff_decay,
            frames_per_peak: config.frames_per_peak,
            cutoff: 0.0,
            frames_since_peak: 0,
            previous_energy: 0.0,
            is_detected: false,
        }
    }

    /// Feed one frame's spectrum; returns whether a new peak fired
    pub fn update(&mut self, spectrum: &[f32], nyquist: f32) -> bool {
        let energy = band_energy(spectrum, nyquist, self.range_hz.0, self.range_hz.1) / SPECTRUM_MAX;
        self.update_energy(energy)
    }

    /// Comparator step on an already-normalised energy value
    pub fn update_energy(&mut self, energy: f32) -> bool {
        let energy = if energy.is_finite() { energy } else { 0.0 };
        let rising = energy - self.previous_energy > 0.0;

        if energy > self.cutoff && energy > self.threshold && rising {
            self.cutoff = energy * self.cutoff_mult;
            self.frames_since_peak = 0;
            self.is_detected = true;
            trace!("spectral peak: energy={:.3} new cutoff={:.3}", energy, self.cutoff);
        } else {
            self.is_detected = false;
            if self.frames_since_peak <= self.frames_per_peak {
                self.frames_since_peak += 1;
            } else {
                self.cutoff = (self.cutoff * self.cutoff_decay).max(self.threshold);
            }
        }

        self.previous_energy = energy;
        self.is_detected
    }

    /// Whether the last update fired
    pub fn is_detected(&self) -> bool {
        self.is_detected
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn reset(&mut self) {
        self.cutoff = 0.0;
        self.frames_since_peak = 0;
        self.previous_energy = 0.0;
        self.is_detected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> PeakDetector {
        PeakDetector::new(&OnsetConfig::default())
    }

    #[test]
    fn test_below_threshold_never_fires() {
        let mut peak = detector();
        for i in 0..30 {
            assert!(!peak.update_energy(0.01 * i as f32));
        }
    }

    #[test]
    fn test_rising_energy_fires_once() {
        let mut peak = detector();
        peak.update_energy(0.1);
        assert!(peak.update_energy(0.5));
        assert!((peak.cutoff() - 0.75).abs() < 1e-6);

        // Still rising but under the raised cutoff
        assert!(!peak.update_energy(0.6));
        assert!(!peak.is_detected());
    }

    #[test]
    fn test_flat_energy_does_not_fire() {
        let mut peak = detector();
        peak.update_energy(0.5);
        // Same energy again: no rise
        assert!(!peak.update_energy(0.5));
    }

    #[test]
    fn test_cutoff_held_then_decays_to_threshold() {
        let mut peak = detector();
        peak.update_energy(0.0);
        assert!(peak.update_energy(0.6));
        let raised = peak.cutoff();

        // Held for frames_per_peak + 1 frames
        for _ in 0..=20 {
            peak.update_energy(0.0);
            assert_eq!(peak.cutoff(), raised);
        }
        peak.update_energy(0.0);
        assert!(peak.cutoff() < raised);

        for _ in 0..200 {
            peak.update_energy(0.0);
        }
        assert!((peak.cutoff() - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_update_from_spectrum() {
        let mut peak = detector();
        assert!(!peak.update(&vec![0.0; 1024], 22050.0));
        assert!(peak.update(&vec![200.0; 1024], 22050.0));
        assert!(!peak.update(&[], 22050.0));
    }

    #[test]
    fn test_reset() {
        let mut peak = detector();
        peak.update_energy(0.9);
        peak.reset();
        assert_eq!(peak.cutoff(), 0.0);
        assert!(peak.update_energy(0.9));
    }
}
