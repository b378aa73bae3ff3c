//! Adapters for the external recognition, translation and synthesis services.
//!
//! Each gateway wraps a raw service trait and folds every failure into a
//! tagged outcome, so callers never handle service errors directly.

pub mod recognizers;
pub mod synthesis;
pub mod transcription;
pub mod translation;

pub use recognizers::{CommandRecognizer, HttpRecognizer};
pub use synthesis::{
    HttpSynthesizer, MockSynthesizer, SpeechSynthesizer, SynthesisGateway, SynthesisOutcome,
};
pub use transcription::{MockRecognizer, SpeechRecognizer, TranscriptResult, TranscriptionGateway};
pub use translation::{
    HttpTranslator, MockTranslator, TranslationGateway, TranslationOutcome, Translator,
};
