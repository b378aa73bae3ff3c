//! WAV container encoding and WAV-file frame source for replay mode.

use crate::audio::frame::AudioFrame;
use crate::error::{GistingError, Result};
use std::io::{Cursor, Read};

/// Encode mono 16-bit samples as a complete WAV file in memory.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Splits a WAV file into transport-sized float frames.
///
/// Channels and sample rate are kept as recorded; the pipeline's normalizer
/// does the downmix.
pub struct WavFrameSource {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    position: usize,
    frame_len: usize,
    sequence: u64,
}

impl WavFrameSource {
    /// Create from any reader, slicing into frames of `frame_ms` milliseconds.
    pub fn from_reader(reader: Box<dyn Read + Send>, frame_ms: u32) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| GistingError::Wav {
            message: format!("Failed to parse WAV file: {}", e),
        })?;

        let spec = wav_reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(GistingError::Wav {
                message: format!(
                    "unusable WAV format: {} channels at {} Hz",
                    spec.channels, spec.sample_rate
                ),
            });
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                wav_reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        }
        .map_err(|e| GistingError::Wav {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        let frames_per_channel =
            (u64::from(spec.sample_rate) * u64::from(frame_ms.max(1)) / 1000).max(1) as usize;

        Ok(Self {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            position: 0,
            frame_len: frames_per_channel * usize::from(spec.channels),
            sequence: 0,
        })
    }

    /// Create from stdin.
    pub fn from_stdin(frame_ms: u32) -> Result<Self> {
        // StdinLock is not Send, so buffer everything first
        let mut buffer = Vec::new();
        std::io::stdin().lock().read_to_end(&mut buffer)?;
        Self::from_reader(Box::new(Cursor::new(buffer)), frame_ms)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Next frame, or `None` once the file is exhausted.
    pub fn next_frame(&mut self) -> Option<AudioFrame> {
        if self.position >= self.samples.len() {
            return None;
        }
        let end = std::cmp::min(self.position + self.frame_len, self.samples.len());
        // Keep whole sample groups so interleaving stays aligned
        let end = end - (end - self.position) % usize::from(self.channels);
        if end == self.position {
            self.position = self.samples.len();
            return None;
        }
        let frame = AudioFrame::new(
            self.samples[self.position..end].to_vec(),
            self.channels,
            self.sample_rate,
        )
        .with_sequence(self.sequence);
        self.position = end;
        self.sequence += 1;
        Some(frame)
    }
}
