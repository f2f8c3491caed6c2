//! Audio input and spectral analysis.
//!
//! Live microphone capture (cpal) or WAV files (hound) feed mono samples to a
//! rolling FFT (rustfft) and an RMS level meter once per render frame.

mod capture;
mod fft;
mod level;
mod wav;

// Re-export public types
pub use capture::MicCapture;
pub use fft::{band_energy, blackman_window, SpectrumSource, SPECTRUM_MAX};
pub use level::{calculate_rms, LevelMeter};
pub use wav::{read_wav_mono, WavInput};
