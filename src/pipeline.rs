//! Single per-frame update pass and the snapshot it publishes.
//!
//! Every tick runs, strictly in order: spectrum refresh, level, band
//! extraction, pitch estimation, smoothing, onset detection, ripple update.
//! All state lives in [`AnalysisPipeline`]; renderers only ever see owned
//! [`AnalysisFrame`] copies.

use tracing::{debug, info, trace};

use crate::analysis::{
    BandEnergyExtractor, FrequencyBands, OnsetDetector, OnsetState, PitchEstimate,
    PitchEstimator, PitchSmoother, SmoothedPitchState, ToneRipple, ToneRippleBank,
    RIPPLE_CHANNELS,
};
use crate::audio::{LevelMeter, SpectrumSource};
use crate::error::{ConfigError, ConfigResult};
use crate::params::AnalysisParams;

/// Immutable per-frame snapshot for rendering and HUD
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisFrame {
    /// Tick number, starting at 1
    pub index: u64,
    pub bands: FrequencyBands,
    /// Unsmoothed estimate of this frame
    pub raw_pitch: PitchEstimate,
    pub pitch: SmoothedPitchState,
    pub onset: OnsetState,
    /// Input level above the audio gate this frame
    pub has_audio: bool,
    pub ripples: [ToneRipple; RIPPLE_CHANNELS],
    /// Copy of the byte-scaled spectrum (0..255)
    pub spectrum: Vec<f32>,
    pub sample_rate: u32,
}

impl AnalysisFrame {
    pub fn beat_flash(&self) -> f32 {
        self.onset.beat_flash
    }

    pub fn peak_flash(&self) -> f32 {
        self.onset.peak_flash
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }
}

/// Owns every analysis component and drives them once per render tick
pub struct AnalysisPipeline {
    params: AnalysisParams,
    spectrum: SpectrumSource,
    level: LevelMeter,
    bands: BandEnergyExtractor,
    pitch: PitchEstimator,
    smoother: PitchSmoother,
    onset: OnsetDetector,
    ripples: ToneRippleBank,
    frame_count: u64,
}

impl AnalysisPipeline {
    /// Build a pipeline for input at `sample_rate`
    ///
    /// Per-tick coefficients are converted to `params.frame.fps` here, so
    /// `params` should hold the reference-rate values.
    pub fn new(params: AnalysisParams, sample_rate: u32) -> ConfigResult<Self> {
        params.validate()?;
        if sample_rate == 0 {
            return Err(ConfigError::Invalid("sample rate must be positive".into()));
        }
        let params = params.retimed_for_frame_rate();
        let nyquist = sample_rate as f32 / 2.0;

        info!(
            "Analysis pipeline: {} Hz, {} bins, {} fps",
            sample_rate,
            params.spectrum.bin_count(),
            params.frame.fps
        );

        Ok(Self {
            spectrum: SpectrumSource::new(&params.spectrum, sample_rate),
            level: LevelMeter::new(params.spectrum.level_smoothing),
            bands: BandEnergyExtractor::new(params.bands.clone()),
            pitch: PitchEstimator::new(params.pitch.clone()),
            smoother: PitchSmoother::new(params.smoother.clone(), params.pitch.a4_hz, nyquist),
            onset: OnsetDetector::new(params.onset.clone()),
            ripples: ToneRippleBank::new(params.ripple.clone()),
            frame_count: 0,
            params,
        })
    }

    /// Run one frame on the newest block of mono samples
    pub fn tick(&mut self, samples: &[f32]) -> AnalysisFrame {
        self.spectrum.push_samples(samples);
        self.spectrum.refresh();

        let sample_rate = self.spectrum.sample_rate();
        let nyquist = self.spectrum.nyquist();
        let spectrum = self.spectrum.spectrum();

        let vol = self.level.update(samples);
        let bands = self.bands.compute_bands(spectrum, nyquist, vol);

        let raw_pitch = self.pitch.estimate(spectrum, sample_rate);
        let dominant = self.smoother.update(raw_pitch).note_index();

        let onset = *self.onset.update(spectrum, nyquist, bands.vol);

        let has_audio = bands.vol > self.params.ripple.audio_level_gate;
        self.ripples.update_all(dominant, has_audio, bands.vol);

        self.frame_count += 1;
        if self.frame_count % 120 == 0 {
            trace!(
                "frame {}: low={:.0} mid={:.0} high={:.0} vol={:.3} pitch={:.1} Hz",
                self.frame_count,
                bands.low,
                bands.mid,
                bands.high,
                bands.vol,
                self.smoother.state().smoothed_frequency_hz
            );
        }

        AnalysisFrame {
            index: self.frame_count,
            bands,
            raw_pitch,
            pitch: self.smoother.state().clone(),
            onset,
            has_audio,
            ripples: *self.ripples.ripples(),
            spectrum: spectrum.to_vec(),
            sample_rate,
        }
    }

    /// Capture stopped: clear pitch, level, onsets and spectrum
    ///
    /// Ripples are left as they are and settle through [`idle_tick`](Self::idle_tick).
    pub fn stop(&mut self) {
        self.spectrum.reset();
        self.level.reset();
        self.smoother.reset();
        self.onset.reset();
        debug!("Analysis pipeline stopped after {} frames", self.frame_count);
    }

    /// Advance the ripple bank with no audio (no capture running)
    pub fn idle_tick(&mut self) {
        self.ripples.update_all(None, false, 0.0);
    }

    /// Ripples, pitch, onsets and spectrum back to their initial state
    pub fn reset(&mut self) {
        self.stop();
        self.ripples.reset();
        self.frame_count = 0;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.spectrum.sample_rate()
    }

    /// Parameters in effect (already converted to the frame rate)
    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Input samples consumed per tick
    pub fn samples_per_frame(&self) -> usize {
        self.params.frame.samples_per_frame(self.sample_rate())
    }

    pub fn pitch_state(&self) -> &SmoothedPitchState {
        self.smoother.state()
    }

    pub fn ripples(&self) -> &[ToneRipple; RIPPLE_CHANNELS] {
        self.ripples.ripples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FrameConfig;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44100;

    fn pipeline() -> AnalysisPipeline {
        AnalysisPipeline::new(AnalysisParams::default(), SAMPLE_RATE).unwrap()
    }

    fn tone(freq: f32, amplitude: f32, start: usize, len: usize) -> Vec<f32> {
        (start..start + len)
            .map(|i| (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin() * amplitude)
            .collect()
    }

    #[test]
    fn test_rejects_invalid_construction() {
        assert!(AnalysisPipeline::new(AnalysisParams::default(), 0).is_err());

        let mut params = AnalysisParams::default();
        params.spectrum.fft_size = 1000;
        assert!(AnalysisPipeline::new(params, SAMPLE_RATE).is_err());
    }

    #[test]
    fn test_silence_frame() {
        let mut pipeline = pipeline();
        let frame = pipeline.tick(&vec![0.0; 735]);

        assert_eq!(frame.index, 1);
        assert_eq!(frame.bands, FrequencyBands::default());
        assert_eq!(frame.raw_pitch, PitchEstimate::NONE);
        assert!(!frame.has_audio);
        assert_eq!(frame.pitch.note_index_i32(), -1);
        assert_eq!(frame.spectrum.len(), 1024);
        assert_eq!(frame.sample_rate, SAMPLE_RATE);
    }

    #[test]
    fn test_sustained_tone_locks_note_and_ripple() {
        let mut pipeline = pipeline();
        let block = 735;
        let mut frame = pipeline.tick(&[]);
        for i in 0..60 {
            frame = pipeline.tick(&tone(440.0, 0.02, i * block, block));
        }

        assert!(frame.has_audio);
        assert_eq!(frame.pitch.note_index(), Some(9), "pitch {:?}", frame.pitch);
        assert!((frame.pitch.smoothed_frequency_hz - 440.0).abs() < 25.0);
        assert!(frame.bands.mid > 0.0);

        // A rings loudest
        let lift = |r: &ToneRipple| r.amplitude - r.base_amplitude;
        assert!(frame.ripples[9].is_active);
        for (i, ripple) in frame.ripples.iter().enumerate().filter(|(i, _)| *i != 9) {
            assert!(lift(ripple) < lift(&frame.ripples[9]), "channel {}", i);
        }
    }

    #[test]
    fn test_stop_resets_pitch_but_not_ripples() {
        let mut pipeline = pipeline();
        for i in 0..30 {
            pipeline.tick(&tone(440.0, 0.02, i * 735, 735));
        }
        pipeline.stop();

        assert_eq!(*pipeline.pitch_state(), SmoothedPitchState::default());
        assert!(pipeline.ripples()[9].is_active);

        for _ in 0..600 {
            pipeline.idle_tick();
        }
        assert!(pipeline.ripples().iter().all(|r| !r.is_active));
    }

    #[test]
    fn test_silence_after_tone_decays_to_rest() {
        let mut pipeline = pipeline();
        for i in 0..30 {
            pipeline.tick(&tone(440.0, 0.02, i * 735, 735));
        }
        let mut frame = pipeline.tick(&vec![0.0; 735]);
        for _ in 0..120 {
            frame = pipeline.tick(&vec![0.0; 735]);
        }
        assert_eq!(frame.pitch.smoothed_frequency_hz, 0.0);
        assert_eq!(frame.pitch.confidence, 0.0);
        assert!(frame.beat_flash() < 0.01);
    }

    #[test]
    fn test_frame_rate_retimes_coefficients() {
        let params = AnalysisParams {
            frame: FrameConfig {
                fps: 30,
                ..Default::default()
            },
            ..Default::default()
        };
        let pipeline = AnalysisPipeline::new(params, SAMPLE_RATE).unwrap();
        let retimed = pipeline.params();
        assert!(retimed.onset.beat_decay > 0.12);
        assert!((retimed.spectrum.smoothing_time_constant - 0.64).abs() < 1e-5);
        assert_eq!(retimed.onset.frames_per_peak, 10);
        assert_eq!(retimed.onset.history_size, 10);
        assert_eq!(pipeline.samples_per_frame(), 1470);
    }

    #[test]
    fn test_reset_restarts_frame_count() {
        let mut pipeline = pipeline();
        pipeline.tick(&[]);
        pipeline.tick(&[]);
        assert_eq!(pipeline.frame_count(), 2);
        pipeline.reset();
        assert_eq!(pipeline.frame_count(), 0);
    }
}
