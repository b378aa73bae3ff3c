//! Utterance accumulation: PCM chunks in, single-rate recognition units out.

use crate::audio::frame::{PcmChunk, rms};
use crate::audio::wav;
use crate::error::Result;

/// A non-empty span of mono 16-bit PCM at a single sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    samples: Vec<i16>,
    sample_rate: u32,
    sequence: u64,
}

impl Utterance {
    /// Build an utterance directly from samples. Returns `None` for an empty span.
    pub fn from_samples(samples: Vec<i16>, sample_rate: u32) -> Option<Self> {
        if samples.is_empty() || sample_rate == 0 {
            return None;
        }
        Some(Self {
            samples,
            sample_rate,
            sequence: 0,
        })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Position of this utterance among those flushed by the same buffer.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Length of the PCM payload in bytes (excluding any container header).
    pub fn byte_len(&self) -> usize {
        self.samples.len() * 2
    }

    pub fn duration_ms(&self) -> u32 {
        (self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)) as u32
    }

    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    /// Encode as a self-describing WAV container (mono, 16-bit, this rate).
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        wav::encode_wav(&self.samples, self.sample_rate)
    }
}

/// Accumulates normalized PCM for one session.
///
/// All samples held at any time share one sample rate. A chunk at a different
/// rate closes the current utterance before it is buffered.
#[derive(Debug, Default)]
pub struct UtteranceBuffer {
    samples: Vec<i16>,
    sample_rate: Option<u32>,
    next_sequence: u64,
}

impl UtteranceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    ///
    /// Returns the previously buffered utterance when the chunk's rate differs
    /// from the buffer's. Empty chunks and chunks without a sample rate are
    /// ignored and never change the rate.
    pub fn push(&mut self, chunk: PcmChunk) -> Option<Utterance> {
        if chunk.samples.is_empty() || chunk.sample_rate == 0 {
            return None;
        }

        let flushed = match self.sample_rate {
            Some(rate) if rate != chunk.sample_rate => self.flush(),
            _ => None,
        };

        self.sample_rate = Some(chunk.sample_rate);
        self.samples.extend_from_slice(&chunk.samples);
        flushed
    }

    /// Take everything buffered as one utterance, or `None` if empty.
    pub fn flush(&mut self) -> Option<Utterance> {
        let rate = self.sample_rate.take()?;
        if self.samples.is_empty() {
            return None;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(Utterance {
            samples: std::mem::take(&mut self.samples),
            sample_rate: rate,
            sequence,
        })
    }

    /// Drop buffered audio without producing an utterance.
    pub fn discard(&mut self) {
        self.samples.clear();
        self.sample_rate = None;
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.samples.len() * 2
    }

    /// Rate of the buffered audio, if any is buffered.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn duration_ms(&self) -> u32 {
        match self.sample_rate {
            Some(rate) if rate > 0 => (self.samples.len() as u64 * 1000 / u64::from(rate)) as u32,
            _ => 0,
        }
    }
}
