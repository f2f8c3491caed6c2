//! Microphone capture: default input device, mixed down to mono into a
//! shared buffer that the frame loop drains once per tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use tracing::{info, warn};

use crate::error::{CaptureError, CaptureResult};

/// Samples written by the audio callback, read by the frame loop
type SharedBuffer = Arc<Mutex<Vec<f32>>>;

/// Seconds of audio kept when the frame loop falls behind
const MAX_BUFFERED_SECS: u32 = 2;

/// Live microphone input
pub struct MicCapture {
    buffer: SharedBuffer,
    sample_rate: u32,
    device_name: String,

    /// Audio input stream (kept alive)
    stream: cpal::Stream,
}

impl MicCapture {
    /// Open the default input device and start streaming
    pub fn start() -> CaptureResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;

        let supported = device.default_input_config()?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        info!(
            "Audio input: {} @ {}Hz, {} channel(s), {:?}",
            device_name,
            sample_rate,
            channels,
            supported.sample_format()
        );

        let buffer: SharedBuffer = Arc::new(Mutex::new(Vec::with_capacity(sample_rate as usize)));
        let max_buffered = (sample_rate * MAX_BUFFERED_SECS) as usize;
        let config: cpal::StreamConfig = supported.config();

        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, channels, &buffer, max_buffered)?
            }
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, channels, &buffer, max_buffered)?
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, channels, &buffer, max_buffered)?
            }
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream.play()?;

        Ok(Self {
            buffer,
            sample_rate,
            device_name,
            stream,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Move every sample captured since the last call into `out`
    pub fn drain_into(&self, out: &mut Vec<f32>) {
        out.clear();
        let mut buffer = lock(&self.buffer);
        out.extend(buffer.drain(..));
    }

    /// Stop streaming and release the device
    pub fn stop(self) {
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause input stream: {}", e);
        }
        info!("Audio input stopped");
    }
}

fn lock(buffer: &Mutex<Vec<f32>>) -> MutexGuard<'_, Vec<f32>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build an input stream converting samples of type `T` to mono f32
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    buffer: &SharedBuffer,
    max_buffered: usize,
) -> CaptureResult<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let buffer = Arc::clone(buffer);
    let channels = channels.max(1);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mut buf = lock(&buffer);
            mix_to_mono(data, channels, &mut buf);

            // Drop the oldest audio if nobody is draining
            let overflow = buf.len().saturating_sub(max_buffered);
            if overflow > 0 {
                buf.drain(..overflow);
            }
        },
        |err| warn!("Audio input stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Average interleaved frames into single mono samples
fn mix_to_mono<T>(data: &[T], channels: usize, out: &mut Vec<f32>)
where
    T: Sample,
    f32: FromSample<T>,
{
    for frame in data.chunks(channels) {
        let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
        out.push(sum / frame.len() as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_to_mono_averages_channels() {
        let mut out = Vec::new();
        mix_to_mono(&[1.0f32, 0.0, 0.5, 0.5], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn test_mix_to_mono_converts_integers() {
        let mut out = Vec::new();
        mix_to_mono(&[i16::MAX, 0i16], 1, &mut out);
        assert!((out[0] - 1.0).abs() < 1e-3);
        assert_eq!(out[1], 0.0);
    }
}
