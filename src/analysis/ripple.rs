//! Twelve tone-ripple envelopes, one per pitch class.
//!
//! Each channel rests at its own base amplitude. While its pitch class is
//! dominant and audio is present the target is boosted linearly by the input
//! level, without an upper bound. The amplitude attacks quickly toward a
//! higher target and releases slowly toward a lower one.

use tracing::debug;

use super::{lerp, map_linear};
use crate::params::RippleConfig;

/// One channel per pitch class
pub const RIPPLE_CHANNELS: usize = 12;

/// Envelope state of one pitch class
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneRipple {
    pub amplitude: f32,
    pub base_amplitude: f32,
    pub release_rate: f32,
    /// Ripple phase clock, restarted when a new ripple begins
    pub time: f32,
    pub is_active: bool,
}

impl ToneRipple {
    fn at_rest(base_amplitude: f32, release_rate: f32) -> Self {
        Self {
            amplitude: base_amplitude,
            base_amplitude,
            release_rate,
            time: 0.0,
            is_active: false,
        }
    }
}

/// The twelve envelopes, updated together once per tick
#[derive(Debug, Clone)]
pub struct ToneRippleBank {
    config: RippleConfig,
    ripples: [ToneRipple; RIPPLE_CHANNELS],
}

impl ToneRippleBank {
    pub fn new(config: RippleConfig) -> Self {
        let ripples = std::array::from_fn(|i| {
            let base = config.base_amplitude
                + (i as f32 * config.base_phase_step).sin() * config.base_variation;
            ToneRipple::at_rest(base, config.release_rate)
        });
        debug!("ToneRippleBank created: {} channels", RIPPLE_CHANNELS);
        Self { config, ripples }
    }

    /// Amplitude channel `index` is driven toward this tick
    pub fn target(&self, index: usize, dominant: Option<usize>, has_audio: bool, vol: f32) -> f32 {
        let Some(ripple) = self.ripples.get(index) else {
            return 0.0;
        };
        if has_audio && dominant == Some(index) {
            ripple.base_amplitude
                + map_linear(vol, self.config.boost_level_range, self.config.boost_range)
        } else {
            ripple.base_amplitude
        }
    }

    /// Advance every envelope by one tick
    ///
    /// `dominant` outside 0..12 boosts nothing.
    pub fn update_all(&mut self, dominant: Option<usize>, has_audio: bool, vol: f32) {
        for index in 0..RIPPLE_CHANNELS {
            let target = self.target(index, dominant, has_audio, vol);
            let config = &self.config;
            let ripple = &mut self.ripples[index];

            if target > ripple.amplitude {
                ripple.amplitude = lerp(ripple.amplitude, target, config.attack);
                if target > ripple.base_amplitude * config.active_ratio {
                    if !ripple.is_active {
                        ripple.time = 0.0;
                    }
                    ripple.is_active = true;
                }
            } else {
                ripple.amplitude = lerp(ripple.amplitude, target, ripple.release_rate);
                if (ripple.amplitude - ripple.base_amplitude).abs() < config.rest_tolerance {
                    ripple.is_active = false;
                }
            }

            ripple.time += if ripple.is_active {
                config.active_time_step
            } else {
                config.idle_time_step
            };
        }
    }

    pub fn ripples(&self) -> &[ToneRipple; RIPPLE_CHANNELS] {
        &self.ripples
    }

    pub fn get(&self, index: usize) -> Option<&ToneRipple> {
        self.ripples.get(index)
    }

    pub fn active_count(&self) -> usize {
        self.ripples.iter().filter(|r| r.is_active).count()
    }

    /// All channels back to rest with their clocks at 0
    pub fn reset(&mut self) {
        for ripple in &mut self.ripples {
            *ripple = ToneRipple::at_rest(ripple.base_amplitude, ripple.release_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnalysisParams;

    fn bank() -> ToneRippleBank {
        ToneRippleBank::new(RippleConfig::default())
    }

    #[test]
    fn test_base_amplitudes() {
        let bank = bank();
        for (i, ripple) in bank.ripples().iter().enumerate() {
            let expected = 0.2 + (i as f32 * 0.5).sin() * 0.08;
            assert!((ripple.base_amplitude - expected).abs() < 1e-6);
            assert_eq!(ripple.amplitude, ripple.base_amplitude);
            assert!(!ripple.is_active);
        }
        // Channels differ from each other
        assert_ne!(bank.ripples()[0].base_amplitude, bank.ripples()[1].base_amplitude);
    }

    #[test]
    fn test_dominant_index_boost() {
        let bank = bank();
        for i in 0..RIPPLE_CHANNELS {
            let target = bank.target(i, Some(3), true, 0.3);
            let base = bank.ripples()[i].base_amplitude;
            if i == 3 {
                assert!((target - (base + 1.2)).abs() < 1e-6);
            } else {
                assert_eq!(target, base);
            }
        }
    }

    #[test]
    fn test_loud_input_boost_is_not_capped() {
        let bank = bank();
        let base = bank.ripples()[3].base_amplitude;
        let boost = bank.target(3, Some(3), true, 0.6) - base;
        assert!((boost - 2.0).abs() < 1e-5, "boost {}", boost);
        // Non-finite level falls back to the quiet end
        let boost = bank.target(3, Some(3), true, f32::NAN) - base;
        assert!((boost - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_retimed_ticks_follow_reference_trajectory() {
        let mut params = AnalysisParams::default();
        params.frame.fps = 120;
        let fast = params.retimed_for_frame_rate().ripple;

        let mut reference = bank();
        let mut doubled = ToneRippleBank::new(fast);
        reference.update_all(Some(4), true, 0.3);
        doubled.update_all(Some(4), true, 0.3);
        doubled.update_all(Some(4), true, 0.3);

        for (a, b) in reference.ripples().iter().zip(doubled.ripples()) {
            assert!((a.amplitude - b.amplitude).abs() < 1e-4);
            assert!((a.time - b.time).abs() < 1e-5);
            assert_eq!(a.is_active, b.is_active);
        }
    }

    #[test]
    fn test_no_boost_without_audio() {
        let bank = bank();
        assert_eq!(bank.target(3, Some(3), false, 0.3), bank.ripples()[3].base_amplitude);
        assert_eq!(bank.target(3, None, true, 0.3), bank.ripples()[3].base_amplitude);
        assert_eq!(bank.target(99, Some(99), true, 0.3), 0.0);
    }

    #[test]
    fn test_attack_activates_and_restarts_clock() {
        let mut bank = bank();
        for _ in 0..10 {
            bank.update_all(None, false, 0.0);
        }
        assert!(bank.ripples()[5].time > 0.0);

        bank.update_all(Some(5), true, 0.3);
        let ripple = bank.ripples()[5];
        assert!(ripple.is_active);
        // Clock restarted, then advanced once at the active rate
        assert!((ripple.time - 0.25).abs() < 1e-6);
        assert!(ripple.amplitude > ripple.base_amplitude);
        assert_eq!(bank.active_count(), 1);

        // Staying dominant does not restart the clock
        bank.update_all(Some(5), true, 0.3);
        assert!((bank.ripples()[5].time - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_idle_time_drift() {
        let mut bank = bank();
        bank.update_all(None, false, 0.0);
        assert!(bank.ripples().iter().all(|r| (r.time - 0.08).abs() < 1e-6));
    }

    #[test]
    fn test_silence_converges_to_base() {
        let mut bank = bank();
        for _ in 0..30 {
            bank.update_all(Some(7), true, 0.5);
        }
        assert!(bank.ripples()[7].is_active);

        for _ in 0..600 {
            bank.update_all(Some(7), false, 0.5);
        }
        for ripple in bank.ripples() {
            assert!((ripple.amplitude - ripple.base_amplitude).abs() < 0.05);
            assert!(!ripple.is_active);
        }
    }

    #[test]
    fn test_reset() {
        let mut bank = bank();
        bank.update_all(Some(2), true, 0.3);
        bank.reset();
        for ripple in bank.ripples() {
            assert_eq!(ripple.amplitude, ripple.base_amplitude);
            assert_eq!(ripple.time, 0.0);
            assert!(!ripple.is_active);
        }
    }
}
