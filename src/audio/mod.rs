//! Audio shaping: transport frames → mono PCM → utterances → WAV containers.

pub mod boundary;
pub mod frame;
pub mod utterance;
pub mod wav;

pub use boundary::{Boundary, BoundaryDetector, BoundaryPolicy};
pub use frame::{AudioFrame, PcmChunk, SampleLayout, normalize};
pub use utterance::{Utterance, UtteranceBuffer};
pub use wav::{WavFrameSource, encode_wav};
