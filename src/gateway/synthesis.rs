//! Text-to-speech boundary.

use crate::error::{GatewayError, GistingError, Result};
use crate::languages;
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use std::sync::Arc;
use std::time::Duration;

const STATION: &str = "synthesis";

/// Longest piece of text sent in a single synthesis request.
const MAX_REQUEST_CHARS: usize = 100;

/// Result of one synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// Compressed audio (MP3).
    Audio(Vec<u8>),
    /// The engine cannot voice this language; no request was made.
    Unsupported { language: String },
    /// The engine is reachable in principle but this request failed.
    Failed(String),
}

impl SynthesisOutcome {
    pub fn audio(&self) -> Option<&[u8]> {
        match self {
            SynthesisOutcome::Audio(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Trait for speech synthesis services.
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language`, returning encoded audio.
    fn synthesize(&self, text: &str, language: &str) -> std::result::Result<Vec<u8>, GatewayError>;

    /// Whether `language` is in the engine's supported set.
    fn supports(&self, language: &str) -> bool {
        languages::synthesis_supported(language)
    }

    fn name(&self) -> &str;
}

impl<T: SpeechSynthesizer> SpeechSynthesizer for Arc<T> {
    fn synthesize(&self, text: &str, language: &str) -> std::result::Result<Vec<u8>, GatewayError> {
        (**self).synthesize(text, language)
    }

    fn supports(&self, language: &str) -> bool {
        (**self).supports(language)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapter producing [`SynthesisOutcome`]s.
#[derive(Clone)]
pub struct SynthesisGateway {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    reporter: Arc<dyn ErrorReporter>,
}

impl SynthesisGateway {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn synthesize(&self, text: &str, language: &str) -> SynthesisOutcome {
        if !self.synthesizer.supports(language) {
            return SynthesisOutcome::Unsupported {
                language: language.to_string(),
            };
        }
        if text.trim().is_empty() {
            return SynthesisOutcome::Failed("no text to speak".to_string());
        }

        match self.synthesizer.synthesize(text, language) {
            Ok(bytes) if !bytes.is_empty() => SynthesisOutcome::Audio(bytes),
            Ok(_) => {
                let message = "service returned no audio".to_string();
                self.reporter
                    .report(STATION, &StationError::Recoverable(message.clone()));
                SynthesisOutcome::Failed(message)
            }
            Err(GatewayError::UnsupportedLanguage(language)) => {
                SynthesisOutcome::Unsupported { language }
            }
            Err(e) => {
                self.reporter.report(
                    STATION,
                    &StationError::Recoverable(format!(
                        "{} ({}): {}",
                        self.synthesizer.name(),
                        language,
                        e
                    )),
                );
                SynthesisOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Split text into pieces of at most `max_chars` characters, preferring
/// sentence punctuation, then whitespace, then a hard cut.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text.trim();
    let max_chars = max_chars.max(1);

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            pieces.push(rest.to_string());
            break;
        }

        // Byte offset of the character just past the limit
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..limit];

        let cut = window
            .rfind(['.', '!', '?', ',', ';', ':', '。', '、'])
            .map(|i| i + window[i..].chars().next().map_or(1, char::len_utf8))
            .or_else(|| window.rfind(char::is_whitespace))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    pieces
}

/// Client for a `translate_tts`-style endpoint that answers GET requests with MP3.
///
/// Long text is sent in pieces and the MP3 streams are concatenated, which
/// players accept as one stream.
pub struct HttpSynthesizer {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpSynthesizer {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GistingError::GatewaySetup {
                gateway: STATION.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl SpeechSynthesizer for HttpSynthesizer {
    fn synthesize(&self, text: &str, language: &str) -> std::result::Result<Vec<u8>, GatewayError> {
        let pieces = split_text(text, MAX_REQUEST_CHARS);
        let total = pieces.len().to_string();
        let mut audio = Vec::new();

        for (idx, piece) in pieces.iter().enumerate() {
            let idx = idx.to_string();
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language),
                    ("q", piece.as_str()),
                    ("idx", idx.as_str()),
                    ("total", total.as_str()),
                ])
                .send()?;

            let status = response.status();
            if !status.is_success() {
                return Err(GatewayError::Status {
                    code: status.as_u16(),
                    body: response.text().unwrap_or_default(),
                });
            }
            audio.extend_from_slice(&response.bytes()?);
        }

        Ok(audio)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Mock synthesizer for testing. Returns a fixed byte payload.
#[derive(Debug)]
pub struct MockSynthesizer {
    audio: Vec<u8>,
    failure: Option<String>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            // MPEG-1 Layer III frame sync followed by padding
            audio: vec![0xFF, 0xFB, 0x90, 0x64, 0, 0, 0, 0],
            failure: None,
        }
    }

    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn synthesize(&self, _text: &str, _language: &str) -> std::result::Result<Vec<u8>, GatewayError> {
        match &self.failure {
            Some(message) => Err(GatewayError::Network(message.clone())),
            None => Ok(self.audio.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
