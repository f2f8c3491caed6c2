//! Beat and spectral-peak onsets, each driving a decaying flash.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::lerp;
use super::peak::PeakDetector;
use crate::params::OnsetConfig;

/// Per-frame onset output
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OnsetState {
    /// Jumps to 1.0 on a beat, decays toward 0 otherwise
    pub beat_flash: f32,

    /// Jumps to 1.0 on a spectral peak, decays toward 0 otherwise
    pub peak_flash: f32,

    /// A beat fired this frame
    pub beat_detected: bool,

    /// A spectral peak fired this frame
    pub peak_detected: bool,
}

/// Volume-history beat detector plus spectral peak detector
///
/// Flashes decay first and are then raised by a detection, so a trigger frame
/// always reads exactly 1.0 and every later frame without a trigger is
/// strictly lower.
#[derive(Debug, Clone)]
pub struct OnsetDetector {
    config: OnsetConfig,
    peak: PeakDetector,
    volume_history: VecDeque<f32>,
    last_level: f32,
    state: OnsetState,
}

impl OnsetDetector {
    pub fn new(config: OnsetConfig) -> Self {
        debug!(
            "OnsetDetector created: history={}, beat_threshold={}, peak_threshold={}",
            config.history_size, config.beat_threshold, config.peak_threshold
        );
        Self {
            peak: PeakDetector::new(&config),
            volume_history: VecDeque::with_capacity(config.history_size),
            last_level: 0.0,
            state: OnsetState::default(),
            config,
        }
    }

    /// Advance one frame with the current spectrum and input level
    pub fn update(&mut self, spectrum: &[f32], nyquist: f32, level: f32) -> &OnsetState {
        let level = if level.is_finite() { level } else { 0.0 };

        // Peak
        self.state.peak_detected = self.peak.update(spectrum, nyquist);
        self.state.peak_flash = lerp(self.state.peak_flash, 0.0, self.config.peak_decay);
        if self.state.peak_detected {
            self.state.peak_flash = 1.0;
        }

        // Beat
        self.volume_history.push_back(level);
        while self.volume_history.len() > self.config.history_size {
            self.volume_history.pop_front();
        }
        let avg_volume = self.average_volume();

        self.state.beat_detected = level - self.last_level > self.config.min_level_rise
            && level > avg_volume * self.config.average_ratio
            && level > self.config.beat_threshold;
        self.state.beat_flash = lerp(self.state.beat_flash, 0.0, self.config.beat_decay);
        if self.state.beat_detected {
            self.state.beat_flash = 1.0;
            trace!("beat: level={:.3} avg={:.3}", level, avg_volume);
        }

        self.last_level = level;
        &self.state
    }

    /// Mean of the volume history (0 when empty)
    pub fn average_volume(&self) -> f32 {
        if self.volume_history.is_empty() {
            return 0.0;
        }
        self.volume_history.iter().sum::<f32>() / self.volume_history.len() as f32
    }

    pub fn history_len(&self) -> usize {
        self.volume_history.len()
    }

    pub fn state(&self) -> &OnsetState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.peak.reset();
        self.volume_history.clear();
        self.last_level = 0.0;
        self.state = OnsetState::default();
        debug!("OnsetDetector reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NYQUIST: f32 = 22050.0;

    fn detector() -> OnsetDetector {
        OnsetDetector::new(OnsetConfig::default())
    }

    #[test]
    fn test_beat_edge_trigger() {
        let mut onset = detector();
        let silent = vec![0.0; 1024];

        for _ in 0..20 {
            assert!(!onset.update(&silent, NYQUIST, 0.05).beat_detected);
        }
        let state = *onset.update(&silent, NYQUIST, 0.5);
        assert!(state.beat_detected);
        assert_eq!(state.beat_flash, 1.0);

        let mut last = state.beat_flash;
        for _ in 0..60 {
            let state = onset.update(&silent, NYQUIST, 0.05);
            assert!(!state.beat_detected);
            assert!(state.beat_flash < last);
            last = state.beat_flash;
        }
    }

    #[test]
    fn test_no_beat_without_rise() {
        let mut onset = detector();
        let silent = vec![0.0; 1024];
        // Loud but steady: never above 1.3x its own average
        for _ in 0..40 {
            assert!(!onset.update(&silent, NYQUIST, 0.6).beat_detected);
        }
        assert_eq!(onset.history_len(), 20);
        assert!((onset.average_volume() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_no_beat_below_threshold() {
        let mut onset = detector();
        let silent = vec![0.0; 1024];
        onset.update(&silent, NYQUIST, 0.0);
        // Rise of 0.09 from silence, but under the 0.1 absolute threshold
        assert!(!onset.update(&silent, NYQUIST, 0.09).beat_detected);
    }

    #[test]
    fn test_peak_flash() {
        let mut onset = detector();
        onset.update(&vec![0.0; 1024], NYQUIST, 0.0);
        let state = *onset.update(&vec![220.0; 1024], NYQUIST, 0.0);
        assert!(state.peak_detected);
        assert_eq!(state.peak_flash, 1.0);

        let state = onset.update(&vec![220.0; 1024], NYQUIST, 0.0);
        assert!(!state.peak_detected);
        assert!((state.peak_flash - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut onset = detector();
        onset.update(&vec![0.0; 1024], NYQUIST, 0.0);
        onset.update(&vec![0.0; 1024], NYQUIST, 0.5);
        onset.reset();
        assert_eq!(*onset.state(), OnsetState::default());
        assert_eq!(onset.history_len(), 0);
    }
}
