//! Low / mid / high band energies and overall level.

use crate::audio::{band_energy, SPECTRUM_MAX};
use crate::params::BandConfig;

/// Audio frequency band energies for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrequencyBands {
    pub low: f32,  // Bass (20-140 Hz), 0..255
    pub mid: f32,  // Mids (140-2000 Hz), 0..255
    pub high: f32, // Highs (2000-16000 Hz), 0..255, gain applied
    pub vol: f32,  // Input level, 0..1
}

/// Reduces the spectrum to three band energies
#[derive(Debug, Clone)]
pub struct BandEnergyExtractor {
    config: BandConfig,
}

impl BandEnergyExtractor {
    pub fn new(config: BandConfig) -> Self {
        Self { config }
    }

    /// Band energies of `spectrum`; `vol` is the live input level, passed through clamped
    pub fn compute_bands(&self, spectrum: &[f32], nyquist: f32, vol: f32) -> FrequencyBands {
        let energy = |(lo, hi): (f32, f32)| band_energy(spectrum, nyquist, lo, hi);
        let clamp_energy = |e: f32| if e.is_finite() { e.clamp(0.0, SPECTRUM_MAX) } else { 0.0 };

        let low = clamp_energy(energy(self.config.low_range_hz));
        let mid = clamp_energy(energy(self.config.mid_range_hz));
        let high = clamp_energy(energy(self.config.high_range_hz) * self.config.high_gain);

        FrequencyBands {
            low,
            mid,
            high,
            vol: if vol.is_finite() { vol.clamp(0.0, 1.0) } else { 0.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NYQUIST: f32 = 22050.0;

    #[test]
    fn test_empty_spectrum_is_silent() {
        let extractor = BandEnergyExtractor::new(BandConfig::default());
        let bands = extractor.compute_bands(&[], NYQUIST, 0.0);
        assert_eq!(bands, FrequencyBands::default());
    }

    #[test]
    fn test_bass_only_spectrum() {
        let extractor = BandEnergyExtractor::new(BandConfig::default());
        let mut spectrum = vec![0.0; 1024];
        // Bins 1..=6 cover ~20-140 Hz
        for value in &mut spectrum[1..=6] {
            *value = 200.0;
        }

        let bands = extractor.compute_bands(&spectrum, NYQUIST, 0.2);
        assert!(bands.low > 150.0, "low was {}", bands.low);
        assert!(bands.mid < 20.0, "mid was {}", bands.mid);
        assert_eq!(bands.high, 0.0);
        assert_eq!(bands.vol, 0.2);
    }

    #[test]
    fn test_high_gain_is_clamped() {
        let extractor = BandEnergyExtractor::new(BandConfig::default());
        let mut spectrum = vec![0.0; 1024];
        for value in &mut spectrum[93..=743] {
            *value = 40.0;
        }

        let bands = extractor.compute_bands(&spectrum, NYQUIST, 0.0);
        assert!((bands.high - 140.0).abs() < 1.0, "high was {}", bands.high);

        spectrum.fill(200.0);
        let bands = extractor.compute_bands(&spectrum, NYQUIST, 0.0);
        assert_eq!(bands.high, 255.0);
    }

    proptest! {
        #[test]
        fn prop_bands_stay_in_bounds(
            spectrum in prop::collection::vec(0.0f32..=255.0, 0..1100),
            vol in -1.0f32..2.0,
        ) {
            let extractor = BandEnergyExtractor::new(BandConfig::default());
            let bands = extractor.compute_bands(&spectrum, NYQUIST, vol);

            prop_assert!((0.0..=255.0).contains(&bands.low));
            prop_assert!((0.0..=255.0).contains(&bands.mid));
            prop_assert!((0.0..=255.0).contains(&bands.high));
            prop_assert!((0.0..=1.0).contains(&bands.vol));
        }
    }
}
