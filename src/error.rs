//! Error types for gisting.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GistingError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio errors
    #[error("Invalid audio frame: {message}")]
    InvalidFrame { message: String },

    #[error("WAV container error: {message}")]
    Wav { message: String },

    // Gateway construction errors (runtime gateway failures are outcomes, not errors)
    #[error("Gateway setup failed for {gateway}: {message}")]
    GatewaySetup { gateway: String, message: String },

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<hound::Error> for GistingError {
    fn from(e: hound::Error) -> Self {
        GistingError::Wav {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GistingError>;

/// Failure reported by an external recognition, translation or synthesis service.
///
/// Gateway adapters never let these escape; they are folded into the
/// outcome types and reported through [`crate::pipeline::ErrorReporter`].
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("service returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("could not decode service response: {0}")]
    Decode(String),

    #[error("no speech detected")]
    NoSpeech,

    #[error("language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_invalid_value_display() {
        let error = GistingError::ConfigInvalidValue {
            key: "transcription.workers".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for transcription.workers: must be at least 1"
        );
    }

    #[test]
    fn test_invalid_frame_display() {
        let error = GistingError::InvalidFrame {
            message: "zero channels".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid audio frame: zero channels");
    }

    #[test]
    fn test_gateway_setup_display() {
        let error = GistingError::GatewaySetup {
            gateway: "translation".to_string(),
            message: "bad endpoint".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Gateway setup failed for translation: bad endpoint"
        );
    }

    #[test]
    fn test_unknown_language_display() {
        let error = GistingError::UnknownLanguage("klingon".to_string());
        assert_eq!(error.to_string(), "Unknown language: klingon");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: GistingError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: GistingError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: GistingError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_gateway_error_display() {
        let error = GatewayError::Status {
            code: 429,
            body: "quota exceeded".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "service returned status 429: quota exceeded"
        );
        assert_eq!(GatewayError::NoSpeech.to_string(), "no speech detected");
        assert_eq!(
            GatewayError::UnsupportedLanguage("zz".to_string()).to_string(),
            "language not supported: zz"
        );
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<GistingError>();
        assert_sync::<GistingError>();
        assert_send::<GatewayError>();
        assert_sync::<GatewayError>();
    }
}
