//! Windowed FFT over the live signal, producing a byte-scaled magnitude
//! spectrum once per render frame.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::{debug, trace};

use crate::params::SpectrumConfig;

/// Upper bound of spectrum values
pub const SPECTRUM_MAX: f32 = 255.0;

/// Rolling FFT analyser
///
/// Owns the spectrum buffer and overwrites it in place on every
/// [`refresh`](Self::refresh); consumers only ever see `&[f32]`.
pub struct SpectrumSource {
    /// FFT instance
    fft: Arc<dyn Fft<f32>>,

    config: SpectrumConfig,

    sample_rate: u32,

    /// Ring buffer of the most recent `fft_size` samples
    input_buffer: Vec<f32>,

    /// Write position in ring buffer (= oldest sample)
    write_pos: usize,

    /// FFT complex buffer
    fft_buffer: Vec<Complex<f32>>,

    /// FFT scratch buffer
    scratch_buffer: Vec<Complex<f32>>,

    /// Blackman window coefficients
    window: Vec<f32>,

    /// Temporally smoothed linear magnitudes
    smoothed: Vec<f32>,

    /// Byte-scaled spectrum published to consumers
    spectrum: Vec<f32>,

    refresh_count: u64,
}

impl SpectrumSource {
    pub fn new(config: &SpectrumConfig, sample_rate: u32) -> Self {
        let fft_size = config.fft_size.max(2);
        let bins = fft_size / 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        let window = (0..fft_size)
            .map(|i| blackman_window(i, fft_size))
            .collect();

        debug!(
            "SpectrumSource created: sample_rate={}, fft_size={}, bins={}",
            sample_rate, fft_size, bins
        );

        Self {
            fft,
            config: config.clone(),
            sample_rate,
            input_buffer: vec![0.0; fft_size],
            write_pos: 0,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch_buffer: vec![Complex::new(0.0, 0.0); scratch_len],
            window,
            smoothed: vec![0.0; bins],
            spectrum: vec![0.0; bins],
            refresh_count: 0,
        }
    }

    /// Append mono samples to the analysis window (non-finite samples count as silence)
    pub fn push_samples(&mut self, samples: &[f32]) {
        let size = self.input_buffer.len();
        // Only the newest `size` samples can influence the window
        let skip = samples.len().saturating_sub(size);
        for &sample in &samples[skip..] {
            self.input_buffer[self.write_pos] = if sample.is_finite() { sample } else { 0.0 };
            self.write_pos = (self.write_pos + 1) % size;
        }
    }

    /// Recompute the spectrum from the current window
    pub fn refresh(&mut self) {
        let size = self.input_buffer.len();

        for i in 0..size {
            let src_idx = (self.write_pos + i) % size;
            self.fft_buffer[i] = Complex::new(self.input_buffer[src_idx] * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch_buffer);

        let tau = self.config.smoothing_time_constant;
        let db_span = self.config.max_decibels - self.config.min_decibels;
        let norm = 1.0 / size as f32;

        for (k, value) in self.spectrum.iter_mut().enumerate() {
            let magnitude = self.fft_buffer[k].norm() * norm;
            let smoothed = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            self.smoothed[k] = if smoothed.is_finite() { smoothed } else { 0.0 };
            *value = to_byte_scale(self.smoothed[k], self.config.min_decibels, db_span);
        }

        self.refresh_count += 1;
        if self.refresh_count % 600 == 0 {
            trace!(
                "Spectrum refresh #{}: peak={:.0}",
                self.refresh_count,
                self.spectrum.iter().copied().fold(0.0f32, f32::max)
            );
        }
    }

    /// Current magnitude spectrum, values in [0, 255]
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Width of one bin (Hz)
    pub fn bin_hz(&self) -> f32 {
        if self.spectrum.is_empty() {
            return 0.0;
        }
        self.nyquist() / self.spectrum.len() as f32
    }

    /// Mean spectrum value between two frequencies (inclusive bin range)
    pub fn energy(&self, f1: f32, f2: f32) -> f32 {
        band_energy(&self.spectrum, self.nyquist(), f1, f2)
    }

    /// Spectrum value of the bin containing `frequency`
    pub fn energy_at(&self, frequency: f32) -> f32 {
        let nyquist = self.nyquist();
        if self.spectrum.is_empty() || nyquist <= 0.0 {
            return 0.0;
        }
        let index = ((frequency / nyquist) * self.spectrum.len() as f32).round();
        let index = (index.max(0.0) as usize).min(self.spectrum.len() - 1);
        self.spectrum[index]
    }

    /// Clear the window and spectrum (capture stopped)
    pub fn reset(&mut self) {
        self.input_buffer.fill(0.0);
        self.write_pos = 0;
        self.smoothed.fill(0.0);
        self.spectrum.fill(0.0);
        self.refresh_count = 0;

        debug!("SpectrumSource reset");
    }
}

/// Mean of `spectrum` over bins `round(f1/nyquist*N) ..= round(f2/nyquist*N)`
///
/// Bounds are swapped when reversed and clamped to the spectrum; an empty
/// spectrum or a zero nyquist yields 0.
pub fn band_energy(spectrum: &[f32], nyquist: f32, f1: f32, f2: f32) -> f32 {
    if spectrum.is_empty() || !(nyquist > 0.0) {
        return 0.0;
    }
    let (lo, hi) = if f1 > f2 { (f2, f1) } else { (f1, f2) };
    let len = spectrum.len();
    let to_index = |f: f32| {
        let index = ((f / nyquist) * len as f32).round();
        (index.max(0.0) as usize).min(len - 1)
    };
    let (lo, hi) = (to_index(lo), to_index(hi));

    let bins = &spectrum[lo..=hi];
    bins.iter().sum::<f32>() / bins.len() as f32
}

/// Map a linear magnitude to the [0, 255] decibel scale
fn to_byte_scale(magnitude: f32, min_decibels: f32, db_span: f32) -> f32 {
    if magnitude <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (SPECTRUM_MAX / db_span) * (db - min_decibels);
    scaled.floor().clamp(0.0, SPECTRUM_MAX)
}

/// Blackman window function for FFT analysis
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin() * amplitude)
            .collect()
    }

    #[test]
    fn test_blackman_window() {
        let size = 2048;

        // Blackman window is ~0 at the edge, 1 at center
        assert!(blackman_window(0, size).abs() < 0.01);
        assert!((blackman_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_silence_gives_zero_spectrum() {
        let mut source = SpectrumSource::new(&SpectrumConfig::default(), 44100);
        source.push_samples(&vec![0.0; 4096]);
        source.refresh();

        assert_eq!(source.spectrum().len(), 1024);
        assert!(source.spectrum().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let config = SpectrumConfig {
            smoothing_time_constant: 0.0,
            ..Default::default()
        };
        let mut source = SpectrumSource::new(&config, 44100);
        source.push_samples(&sine(440.0, 0.1, 44100.0, 4096));
        source.refresh();

        let (peak_bin, peak) = source
            .spectrum()
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, v)| if v > best.1 { (i, v) } else { best });

        // 440 Hz / 21.53 Hz per bin = bin 20.4
        assert!((20..=21).contains(&peak_bin), "peak at bin {}", peak_bin);
        assert!(peak > 200.0, "peak value {}", peak);
        assert!(source.spectrum().iter().all(|&v| (0.0..=255.0).contains(&v)));
    }

    #[test]
    fn test_smoothing_ramps_toward_signal() {
        let mut source = SpectrumSource::new(&SpectrumConfig::default(), 44100);
        let tone = sine(1000.0, 0.05, 44100.0, 2048);

        source.push_samples(&tone);
        source.refresh();
        let first = source.energy_at(1000.0);
        source.push_samples(&tone);
        source.refresh();
        let second = source.energy_at(1000.0);

        assert!(second > first, "{} should exceed {}", second, first);
    }

    #[test]
    fn test_non_finite_samples_are_silence() {
        let mut source = SpectrumSource::new(&SpectrumConfig::default(), 44100);
        source.push_samples(&[f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 0.0]);
        source.refresh();

        assert!(source.spectrum().iter().all(|v| v.is_finite() && *v == 0.0));
    }

    #[test]
    fn test_band_energy_bounds() {
        let spectrum = vec![100.0; 1024];
        assert_eq!(band_energy(&spectrum, 22050.0, 20.0, 140.0), 100.0);
        // Reversed and out-of-range bounds are tolerated
        assert_eq!(band_energy(&spectrum, 22050.0, 30000.0, 2000.0), 100.0);
        assert_eq!(band_energy(&[], 22050.0, 20.0, 140.0), 0.0);
        assert_eq!(band_energy(&spectrum, 0.0, 20.0, 140.0), 0.0);
    }

    #[test]
    fn test_reset_clears_spectrum() {
        let mut source = SpectrumSource::new(&SpectrumConfig::default(), 44100);
        source.push_samples(&sine(440.0, 0.5, 44100.0, 2048));
        source.refresh();
        assert!(source.energy(400.0, 480.0) > 0.0);

        source.reset();
        assert!(source.spectrum().iter().all(|&v| v == 0.0));
    }
}
