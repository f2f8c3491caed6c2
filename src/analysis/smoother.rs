//! Frame-to-frame smoothing of the raw pitch estimate.

use tracing::{debug, trace};

use super::pitch::{freq_to_note, Note, PitchEstimate};
use super::{lerp, map_clamped};
use crate::params::SmootherConfig;

/// Hue before the first detection
const INITIAL_HUE: f32 = 200.0;

/// Persistent pitch state read by the renderer
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothedPitchState {
    /// Exponentially smoothed fundamental (Hz), 0 at rest
    pub smoothed_frequency_hz: f32,

    /// Raw frequency of the last accepted frame, 0 while no pitch
    pub current_frequency_hz: f32,

    /// Smoothed confidence in [0, 1]
    pub confidence: f32,

    /// Pitch class of the last accepted frame, `None` while no pitch
    pub note: Option<Note>,

    /// Display hue in degrees, [0, 360)
    pub hue: f32,

    /// Frequency shown in the readout; on a silent tick this is the smoothed
    /// value from before that tick's decay
    pub readout_frequency_hz: f32,
}

impl Default for SmoothedPitchState {
    fn default() -> Self {
        Self {
            smoothed_frequency_hz: 0.0,
            current_frequency_hz: 0.0,
            confidence: 0.0,
            note: None,
            hue: INITIAL_HUE,
            readout_frequency_hz: 0.0,
        }
    }
}

impl SmoothedPitchState {
    /// Pitch class index 0..=11, if a confident pitch is present
    pub fn note_index(&self) -> Option<usize> {
        self.note.map(|note| note.index)
    }

    /// Pitch class index with -1 for "no pitch" (uniform / wire form)
    pub fn note_index_i32(&self) -> i32 {
        self.note_index().map_or(-1, |index| index as i32)
    }

    /// Frequency shown to the user: smoothed when available, else raw
    pub fn display_frequency_hz(&self) -> f32 {
        let freq = if self.smoothed_frequency_hz > 0.0 {
            self.smoothed_frequency_hz
        } else {
            self.current_frequency_hz
        };
        freq.max(0.0)
    }

    /// Readout text, e.g. "440.0 Hz"
    ///
    /// Lags the decay by one tick: the first silent tick after 440 Hz still
    /// reads "440.0 Hz".
    pub fn note_text(&self) -> String {
        format!("{:.1} Hz", self.readout_frequency_hz.max(0.0))
    }
}

/// Blends raw estimates into [`SmoothedPitchState`] and decays it in silence
#[derive(Debug, Clone)]
pub struct PitchSmoother {
    config: SmootherConfig,
    a4_hz: f32,
    nyquist: f32,
    state: SmoothedPitchState,
}

impl PitchSmoother {
    /// `a4_hz` names notes; `nyquist` bounds the hue mapping for unnamed frequencies
    pub fn new(config: SmootherConfig, a4_hz: f32, nyquist: f32) -> Self {
        debug!(
            "PitchSmoother created: gate={} Hz / {}, a4={} Hz",
            config.min_frequency_hz, config.min_confidence, a4_hz
        );
        Self {
            config,
            a4_hz,
            nyquist,
            state: SmoothedPitchState::default(),
        }
    }

    /// Fold one raw estimate into the state; call exactly once per tick
    pub fn update(&mut self, raw: PitchEstimate) -> &SmoothedPitchState {
        let confident = raw.frequency_hz > self.config.min_frequency_hz
            && raw.confidence > self.config.min_confidence
            && raw.frequency_hz.is_finite();

        if confident {
            self.accept(raw);
        } else {
            self.release();
        }
        &self.state
    }

    fn accept(&mut self, raw: PitchEstimate) {
        let config = &self.config;
        let state = &mut self.state;

        state.confidence =
            lerp(state.confidence, raw.confidence.clamp(0.0, 1.0), config.confidence_attack);
        state.current_frequency_hz = raw.frequency_hz;
        // First sample after rest snaps instead of sweeping up from 0
        state.smoothed_frequency_hz = if state.smoothed_frequency_hz == 0.0 {
            raw.frequency_hz
        } else {
            lerp(state.smoothed_frequency_hz, raw.frequency_hz, config.frequency_attack)
        };
        state.readout_frequency_hz = state.display_frequency_hz();

        state.note = freq_to_note(raw.frequency_hz, self.a4_hz);
        state.hue = match state.note {
            Some(note) => (note.index as f32 * 30.0 + 180.0) % 360.0,
            None => {
                map_clamped(
                    raw.frequency_hz,
                    (config.min_frequency_hz, self.nyquist),
                    config.fallback_hue_range,
                ) % 360.0
            }
        };

        trace!(
            "pitch accepted: raw={:.1} Hz smoothed={:.1} Hz conf={:.3} note={:?}",
            raw.frequency_hz,
            state.smoothed_frequency_hz,
            state.confidence,
            state.note.map(|n| n.name())
        );
    }

    fn release(&mut self) {
        let config = &self.config;
        let state = &mut self.state;

        state.confidence = lerp(state.confidence, 0.0, config.confidence_release);
        if state.confidence < config.rest_confidence {
            state.confidence = 0.0;
        }

        state.readout_frequency_hz = state.smoothed_frequency_hz.max(0.0);
        state.smoothed_frequency_hz = lerp(state.smoothed_frequency_hz, 0.0, config.frequency_release);
        if state.smoothed_frequency_hz < config.rest_frequency_hz {
            state.smoothed_frequency_hz = 0.0;
        }

        state.current_frequency_hz = 0.0;
        state.note = None;
        state.hue = lerp(state.hue, config.rest_hue, config.hue_release);
    }

    /// Back to the initial state (capture stopped)
    ///
    /// Frequencies, confidence and note are cleared. Hue is neither zeroed nor
    /// kept: it goes back to the initial 200 degrees.
    pub fn reset(&mut self) {
        self.state = SmoothedPitchState::default();
        debug!("PitchSmoother reset");
    }

    pub fn state(&self) -> &SmoothedPitchState {
        &self.state
    }
}
