//! WAV file input for offline analysis.

use std::path::Path;

use tracing::info;

use crate::error::CaptureResult;

/// Decoded WAV audio, mixed down to mono
#[derive(Debug, Clone)]
pub struct WavInput {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl WavInput {
    /// Duration in seconds
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Read a WAV file (integer or float PCM) into mono f32 samples in [-1, 1]
pub fn read_wav_mono(path: &Path) -> CaptureResult<WavInput> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    info!(
        "WAV input: {:?} @ {}Hz, {} channel(s), {:.1}s",
        path,
        spec.sample_rate,
        spec.channels,
        samples.len() as f32 / spec.sample_rate.max(1) as f32
    );

    Ok(WavInput {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tonescope-{}-{}.wav", name, std::process::id()))
    }

    #[test]
    fn test_read_stereo_int_wav_as_mono() {
        let path = temp_path("stereo-int");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let input = read_wav_mono(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(input.sample_rate, 8000);
        assert_eq!(input.channels, 2);
        assert_eq!(input.samples.len(), 100);
        assert!((input.samples[0] - 0.5).abs() < 1e-3);
        assert!((input.duration_secs() - 0.0125).abs() < 1e-6);
    }

    #[test]
    fn test_read_float_wav() {
        let path = temp_path("mono-float");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.25f32).unwrap();
        writer.write_sample(-0.25f32).unwrap();
        writer.finalize().unwrap();

        let input = read_wav_mono(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(input.samples, vec![0.25, -0.25]);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(read_wav_mono(Path::new("/nonexistent/tonescope.wav")).is_err());
    }
}
