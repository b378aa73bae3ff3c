//! Speech recognition boundary.
//!
//! [`SpeechRecognizer`] is the raw service; [`TranscriptionGateway`] wraps it so
//! that every failure becomes [`TranscriptResult::Unrecognized`] and the
//! session survives a bad utterance.

use crate::audio::Utterance;
use crate::defaults;
use crate::error::GatewayError;
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const STATION: &str = "transcription";

/// Outcome of recognizing one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptResult {
    /// Non-empty recognized text.
    Recognized(String),
    /// Nothing usable came back.
    Unrecognized,
}

impl TranscriptResult {
    pub fn text(&self) -> Option<&str> {
        match self {
            TranscriptResult::Recognized(text) => Some(text),
            TranscriptResult::Unrecognized => None,
        }
    }

    /// Text to show the user: the transcript or the unrecognized notice.
    pub fn display_text(&self) -> &str {
        self.text().unwrap_or(defaults::UNRECOGNIZED_NOTICE)
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, TranscriptResult::Recognized(_))
    }
}

/// Trait for speech-to-text services.
///
/// Receives a complete WAV container (mono, 16-bit) and the spoken language.
pub trait SpeechRecognizer: Send + Sync {
    fn recognize(&self, wav: &[u8], language: &str) -> Result<String, GatewayError>;

    /// Name of the backend for diagnostics.
    fn name(&self) -> &str;
}

impl<T: SpeechRecognizer> SpeechRecognizer for Arc<T> {
    fn recognize(&self, wav: &[u8], language: &str) -> Result<String, GatewayError> {
        (**self).recognize(wav, language)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapter that turns recognizer results into [`TranscriptResult`]s.
#[derive(Clone)]
pub struct TranscriptionGateway {
    recognizer: Arc<dyn SpeechRecognizer>,
    min_energy: f32,
    reporter: Arc<dyn ErrorReporter>,
}

impl TranscriptionGateway {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            recognizer,
            min_energy: defaults::MIN_ENERGY_FOR_TRANSCRIPTION,
            reporter: Arc::new(LogReporter),
        }
    }

    /// Utterances quieter than this RMS never reach the recognizer.
    pub fn with_min_energy(mut self, min_energy: f32) -> Self {
        self.min_energy = min_energy;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Recognize one utterance. Never fails; problems are reported and
    /// collapse to [`TranscriptResult::Unrecognized`].
    pub fn transcribe(&self, utterance: Utterance, language: &str) -> TranscriptResult {
        if utterance.rms() < self.min_energy {
            return TranscriptResult::Unrecognized;
        }

        let wav = match utterance.to_wav() {
            Ok(wav) => wav,
            Err(e) => {
                self.reporter.report(
                    STATION,
                    &StationError::Recoverable(format!(
                        "could not package utterance {}: {}",
                        utterance.sequence(),
                        e
                    )),
                );
                return TranscriptResult::Unrecognized;
            }
        };
        drop(utterance);

        match self.recognizer.recognize(&wav, language) {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    TranscriptResult::Unrecognized
                } else {
                    TranscriptResult::Recognized(text.to_string())
                }
            }
            Err(e) => {
                self.reporter.report(
                    STATION,
                    &StationError::Recoverable(format!(
                        "{} could not transcribe ({}): {}",
                        self.recognizer.name(),
                        language,
                        e
                    )),
                );
                TranscriptResult::Unrecognized
            }
        }
    }
}

/// Mock recognizer for testing.
#[derive(Debug)]
pub struct MockRecognizer {
    response: String,
    failure: Option<fn() -> GatewayError>,
    calls: AtomicUsize,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            response: "mock transcription".to_string(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the mock to return a specific response.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail with the given error on every call.
    pub fn with_failure(mut self, failure: fn() -> GatewayError) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Number of times the recognizer was actually called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn recognize(&self, wav: &[u8], _language: &str) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        if !wav.starts_with(b"RIFF") {
            return Err(GatewayError::Decode("not a WAV container".to_string()));
        }
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
