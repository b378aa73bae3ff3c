//! Machine translation boundary.

use crate::error::{GatewayError, GistingError, Result};
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const STATION: &str = "translation";

/// Result of one translation request. Always a value, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Translated(String),
    /// The service failed; carries a human-readable diagnostic.
    Failed(String),
}

impl TranslationOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            TranslationOutcome::Translated(text) => Some(text),
            TranslationOutcome::Failed(_) => None,
        }
    }

    /// What to show where the translation would appear.
    pub fn display_text(&self) -> String {
        match self {
            TranslationOutcome::Translated(text) => text.clone(),
            TranslationOutcome::Failed(message) => format!("[Translation Error: {}]", message),
        }
    }
}

/// Trait for translation services.
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` (or `"auto"`) into `target`.
    fn translate(&self, text: &str, source: &str, target: &str) -> std::result::Result<String, GatewayError>;

    fn name(&self) -> &str;
}

impl<T: Translator> Translator for Arc<T> {
    fn translate(&self, text: &str, source: &str, target: &str) -> std::result::Result<String, GatewayError> {
        (**self).translate(text, source, target)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapter producing [`TranslationOutcome`]s. No retries, no caching.
#[derive(Clone)]
pub struct TranslationGateway {
    translator: Arc<dyn Translator>,
    reporter: Arc<dyn ErrorReporter>,
}

impl TranslationGateway {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn translate(&self, text: &str, source: &str, target: &str) -> TranslationOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TranslationOutcome::Translated(String::new());
        }
        if source.eq_ignore_ascii_case(target) {
            return TranslationOutcome::Translated(text.to_string());
        }

        match self.translator.translate(text, source, target) {
            Ok(translated) if !translated.trim().is_empty() => {
                TranslationOutcome::Translated(translated.trim().to_string())
            }
            Ok(_) => {
                let message = "service returned an empty translation".to_string();
                self.reporter
                    .report(STATION, &StationError::Recoverable(message.clone()));
                TranslationOutcome::Failed(message)
            }
            Err(e) => {
                self.reporter.report(
                    STATION,
                    &StationError::Recoverable(format!(
                        "{} ({} → {}): {}",
                        self.translator.name(),
                        source,
                        target,
                        e
                    )),
                );
                TranslationOutcome::Failed(e.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

/// Client for a LibreTranslate-compatible `/translate` endpoint.
pub struct HttpTranslator {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTranslator {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
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
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

impl Translator for HttpTranslator {
    fn translate(&self, text: &str, source: &str, target: &str) -> std::result::Result<String, GatewayError> {
        let request = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self.client.post(&self.endpoint).json(&request).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                code: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let body: TranslateResponse = response.json()?;
        match (body.translated_text, body.error) {
            (Some(text), _) => Ok(text),
            (None, Some(error)) => Err(GatewayError::Decode(error)),
            (None, None) => Err(GatewayError::Decode(
                "response carried neither translatedText nor error".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Mock translator for testing.
///
/// Returns `"[<target>] <text>"` unless configured otherwise.
#[derive(Debug, Default)]
pub struct MockTranslator {
    response: Option<String>,
    failure: Option<String>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = Some(response.to_string());
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

impl Translator for MockTranslator {
    fn translate(&self, text: &str, _source: &str, target: &str) -> std::result::Result<String, GatewayError> {
        if let Some(message) = &self.failure {
            return Err(GatewayError::Network(message.clone()));
        }
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| format!("[{}] {}", target, text)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
