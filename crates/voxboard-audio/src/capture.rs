//! Microphone capture with an explicit start/stop toggle.
//!
//! The recorder is a two-state machine: `start` opens the input stream and
//! begins accumulating samples, `stop` closes it and hands the samples back.
//! The stream handle is not `Send`; the recording stays on the thread that
//! started it.

use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use hound::{WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Sample rate for audio recording (16 kHz), matching the backend
/// recognizer's preferred input rate.
const SAMPLE_RATE: u32 = 16_000;

/// Mono input keeps uploads small and is all the recognizer consumes.
const CHANNELS: u16 = 1;

const BITS_PER_SAMPLE: u16 = 16;

/// Microphone recorder for the voice console.
#[derive(Debug, Default)]
pub struct Recorder;

impl Recorder {
    /// Opens the default input device and starts capturing.
    ///
    /// # Errors
    ///
    /// Fails when no input device exists or the stream cannot be built or
    /// started.
    pub fn start(&self) -> Result<ActiveRecording, AudioError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;
        let config = input_config();
        let samples = Arc::new(Mutex::new(Vec::new()));
        let stream = build_input_stream(&device, &config, samples.clone())?;
        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        Ok(ActiveRecording { stream, samples })
    }
}

/// An in-progress recording. Dropping it discards the captured audio.
pub struct ActiveRecording {
    stream: Stream,
    samples: Arc<Mutex<Vec<i16>>>,
}

impl ActiveRecording {
    /// Stops the capture and returns the accumulated 16-bit PCM samples.
    pub fn stop(self) -> Vec<i16> {
        drop(self.stream);
        let samples = self.samples.lock().expect("sample buffer poisoned").clone();
        tracing::debug!(count = samples.len(), "recording stopped");
        samples
    }
}

/// Packages PCM samples as an in-memory WAV file ready for upload.
pub fn encode_wav(samples: &[i16]) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

fn input_config() -> StreamConfig {
    StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    }
}

fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    samples: Arc<Mutex<Vec<i16>>>,
) -> Result<Stream, AudioError> {
    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &_| push_samples(&samples, data),
            |error| tracing::warn!("audio stream error: {error}"),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))
}

/// Converts floating-point frames to 16-bit PCM and appends them.
fn push_samples(buffer: &Arc<Mutex<Vec<i16>>>, data: &[f32]) {
    let mut guard = buffer.lock().expect("sample buffer poisoned");
    for &sample in data {
        guard.push((sample * i16::MAX as f32) as i16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_config_matches_constants() {
        let config = input_config();
        assert_eq!(config.channels, CHANNELS);
        assert_eq!(config.sample_rate.0, SAMPLE_RATE);
    }

    #[test]
    fn push_samples_converts_floats() {
        let samples = Arc::new(Mutex::new(Vec::new()));
        push_samples(&samples, &[0.0, 0.5, -1.0]);
        let guard = samples.lock().unwrap();
        assert_eq!(guard.len(), 3);
        assert_eq!(guard[0], 0);
        assert!(guard[1] > 0);
        assert!(guard[2] < 0);
    }

    #[test]
    fn encode_wav_produces_a_riff_header() {
        let bytes = encode_wav(&[0, 1_000, -1_000, i16::MAX]).expect("encode should succeed");
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample.
        assert_eq!(bytes.len(), 44 + 4 * 2);
    }

    #[test]
    fn encode_wav_of_silence_is_header_only_payload() {
        let bytes = encode_wav(&[]).expect("encode should succeed");
        assert_eq!(bytes.len(), 44);
    }
}
