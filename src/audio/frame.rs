//! Transport frames and their normalized mono PCM form.

use crate::error::{GistingError, Result};

/// Scale applied to a normalized float sample to reach the i16 range.
const I16_SCALE: f32 = 32767.0;

/// How multi-channel samples are arranged inside [`AudioFrame::samples`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleLayout {
    /// `L R L R ...`
    #[default]
    Interleaved,
    /// `L L ... R R ...`, one contiguous plane per channel.
    Planar,
}

/// One slice of captured audio as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Float samples, nominally in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Number of channels (>= 1).
    pub channels: u16,
    /// Declared sample rate in Hz.
    pub sample_rate: u32,
    /// Channel arrangement of `samples`.
    pub layout: SampleLayout,
    /// Sequence number assigned by the transport.
    pub sequence: u64,
}

impl AudioFrame {
    /// Creates an interleaved frame with sequence number 0.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            layout: SampleLayout::Interleaved,
            sequence: 0,
        }
    }

    pub fn with_layout(mut self, layout: SampleLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Number of samples each channel carries.
    pub fn samples_per_channel(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Duration of this frame in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples_per_channel() as u64 * 1000 / u64::from(self.sample_rate)) as u32
    }

    /// Reject frames whose shape cannot be normalized.
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(GistingError::InvalidFrame {
                message: "frame declares zero channels".to_string(),
            });
        }
        if self.sample_rate == 0 {
            return Err(GistingError::InvalidFrame {
                message: "frame declares a zero sample rate".to_string(),
            });
        }
        if self.samples.len() % usize::from(self.channels) != 0 {
            return Err(GistingError::InvalidFrame {
                message: format!(
                    "{} samples do not divide into {} channels",
                    self.samples.len(),
                    self.channels
                ),
            });
        }
        Ok(())
    }
}

/// Canonical mono 16-bit PCM at the originating frame's rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl PcmChunk {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Size of the chunk as little-endian 16-bit PCM bytes.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * 2
    }

    pub fn duration_ms(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)) as u32
    }

    /// RMS level on the normalized 0.0..=1.0 scale.
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }
}

/// RMS level of 16-bit samples, scaled to 0.0..=1.0.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let v = f64::from(s) / f64::from(i16::MAX);
            v * v
        })
        .sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Convert one float sample to i16.
///
/// Out-of-range values are clamped to `[-1.0, 1.0]`, the result is scaled by
/// 32767 and rounded to nearest with ties away from zero. NaN maps to 0.
pub fn sample_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * I16_SCALE).round() as i16
}

/// Normalize one frame into a mono 16-bit chunk.
///
/// Channels are averaged in the float domain before conversion. The sample
/// rate is carried over untouched; no resampling happens here.
pub fn normalize(frame: &AudioFrame) -> Result<PcmChunk> {
    frame.validate()?;

    let channels = usize::from(frame.channels);
    let per_channel = frame.samples_per_channel();

    let samples = if channels == 1 {
        frame.samples.iter().map(|&s| sample_to_i16(s)).collect()
    } else {
        let mut mono = Vec::with_capacity(per_channel);
        match frame.layout {
            SampleLayout::Interleaved => {
                for group in frame.samples.chunks_exact(channels) {
                    let sum: f32 = group.iter().sum();
                    mono.push(sample_to_i16(sum / channels as f32));
                }
            }
            SampleLayout::Planar => {
                for i in 0..per_channel {
                    let sum: f32 = (0..channels)
                        .map(|c| frame.samples[c * per_channel + i])
                        .sum();
                    mono.push(sample_to_i16(sum / channels as f32));
                }
            }
        }
        mono
    };

    Ok(PcmChunk::new(samples, frame.sample_rate))
}
