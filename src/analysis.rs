//! Per-frame feature extraction.
//!
//! Band energies, dominant pitch with smoothing, beat/peak onsets and the
//! twelve tone-ripple envelopes. Every component is a plain owned struct
//! updated once per render tick; none of them can fail.

mod bands;
mod onset;
mod peak;
mod pitch;
mod ripple;
mod smoother;

// Re-export public types
pub use bands::{BandEnergyExtractor, FrequencyBands};
pub use onset::{OnsetDetector, OnsetState};
pub use peak::PeakDetector;
pub use pitch::{freq_to_note, Note, PitchEstimate, PitchEstimator, NOTE_NAMES};
pub use ripple::{ToneRipple, ToneRippleBank, RIPPLE_CHANNELS};
pub use smoother::{PitchSmoother, SmoothedPitchState};

/// One step of exponential interpolation: `x + (target - x) * factor`
pub(crate) fn lerp(x: f32, target: f32, factor: f32) -> f32 {
    x + (target - x) * factor
}

/// Linear map of `value` from `from` onto `to`, extrapolating past either end
///
/// A zero-width `from` range or a non-finite `value` maps to `to.0`.
pub(crate) fn map_linear(value: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    let span = from.1 - from.0;
    if !(span.abs() > f32::EPSILON) || !value.is_finite() {
        return to.0;
    }
    to.0 + (to.1 - to.0) * ((value - from.0) / span)
}

/// Linear map of `value` from `from` onto `to`, clamped to `to`
pub(crate) fn map_clamped(value: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    let span = from.1 - from.0;
    if !(span.abs() > f32::EPSILON) || !value.is_finite() {
        return to.0;
    }
    let t = ((value - from.0) / span).clamp(0.0, 1.0);
    to.0 + (to.1 - to.0) * t
}
