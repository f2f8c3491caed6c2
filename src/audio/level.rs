//! Instantaneous input level (RMS), the `vol` of the frequency bands.

/// RMS level meter with optional smoothing
#[derive(Debug, Clone, Default)]
pub struct LevelMeter {
    /// Weight of the previous level (0 = instantaneous)
    smoothing: f32,
    level: f32,
}

impl LevelMeter {
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(0.0, 0.999),
            level: 0.0,
        }
    }

    /// Measure the newest block of samples; returns the level in [0, 1]
    pub fn update(&mut self, samples: &[f32]) -> f32 {
        let rms = calculate_rms(samples);
        let level = self.level * self.smoothing + rms * (1.0 - self.smoothing);
        self.level = level.clamp(0.0, 1.0);
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

/// Calculate RMS from samples, ignoring non-finite values
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples
        .iter()
        .map(|&s| if s.is_finite() { s * s } else { 0.0 })
        .sum();
    (sum / samples.len() as f32).sqrt()
}
