//! Speech recognizer backends.
//!
//! - [`HttpRecognizer`]: OpenAI-compatible `/audio/transcriptions` endpoint.
//! - [`CommandRecognizer`]: any local program that reads a WAV file and prints text.

use crate::error::{GatewayError, GistingError, Result};
use crate::gateway::transcription::SpeechRecognizer;
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use serde::Deserialize;
use std::io::Write;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder replaced by the temporary WAV path in command arguments.
pub const FILE_PLACEHOLDER: &str = "{file}";
/// Placeholder replaced by the language code in command arguments.
pub const LANG_PLACEHOLDER: &str = "{lang}";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Recognition languages are plain ISO-639-1 codes; strip regional suffixes.
fn primary_subtag(language: &str) -> &str {
    language.split(['-', '_']).next().unwrap_or(language)
}

/// Recognizer backed by an OpenAI-compatible HTTP transcription service.
pub struct HttpRecognizer {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpRecognizer {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GistingError::GatewaySetup {
                gateway: "transcription".to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let mut base_url = base_url.trim_end_matches('/').to_string();
        if let Some(stripped) = base_url.strip_suffix("/audio/transcriptions") {
            base_url = stripped.to_string();
        }

        Ok(Self {
            client,
            base_url,
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn url(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }
}

impl SpeechRecognizer for HttpRecognizer {
    fn recognize(&self, wav: &[u8], language: &str) -> std::result::Result<String, GatewayError> {
        let part = reqwest::blocking::multipart::Part::bytes(wav.to_vec())
            .file_name("utterance.wav")
            .mime_str("audio/wav")?;

        let mut form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "json");
        if !language.is_empty() && language != crate::defaults::AUTO_LANGUAGE {
            form = form.text("language", primary_subtag(language).to_string());
        }

        let mut request = self.client.post(self.url()).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                code: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let body: TranscriptionResponse = response.json()?;
        let text = body.text.trim();
        if text.is_empty() {
            return Err(GatewayError::NoSpeech);
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Recognizer that runs a local program on a temporary WAV file.
///
/// Arguments may contain `{file}` and `{lang}`. The program's stdout is the
/// transcript. The temporary file is removed before `recognize` returns.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    reporter: Arc<dyn ErrorReporter>,
}

impl CommandRecognizer {
    /// Build from an argv list; the first element is the program.
    pub fn new(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| GistingError::GatewaySetup {
            gateway: "transcription".to_string(),
            message: "recognizer command is empty".to_string(),
        })?;
        if !args.iter().any(|a| a.contains(FILE_PLACEHOLDER)) {
            return Err(GistingError::GatewaySetup {
                gateway: "transcription".to_string(),
                message: format!("recognizer command must reference {}", FILE_PLACEHOLDER),
            });
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            reporter: Arc::new(LogReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    fn run(&self, path: &str, language: &str) -> std::result::Result<String, GatewayError> {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                a.replace(FILE_PLACEHOLDER, path)
                    .replace(LANG_PLACEHOLDER, language)
            })
            .collect();

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| GatewayError::Command(format!("Failed to execute {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GatewayError::Command(format!(
                "{} failed with status {:?}: {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(GatewayError::NoSpeech);
        }
        Ok(text)
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn recognize(&self, wav: &[u8], language: &str) -> std::result::Result<String, GatewayError> {
        let mut file = tempfile::Builder::new()
            .prefix("gisting-")
            .suffix(".wav")
            .tempfile()?;

        let result = file
            .write_all(wav)
            .and_then(|()| file.flush())
            .map_err(GatewayError::from)
            .and_then(|()| {
                let path = file.path().to_string_lossy().into_owned();
                self.run(&path, language)
            });

        // Explicit close so a failed delete is visible; it never replaces the result
        if let Err(e) = file.close() {
            self.reporter.report(
                "transcription",
                &StationError::Recoverable(format!("could not remove temporary audio: {}", e)),
            );
        }

        result
    }

    fn name(&self) -> &str {
        &self.program
    }
}
