//! gisting - real-time voice translator
//!
//! Transport frames in; transcript, translation and synthesized speech out.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod gateway;
pub mod languages;
#[cfg(feature = "cli")]
pub mod output;
pub mod pipeline;
pub mod transport;

// Composition root - needs everything
#[cfg(feature = "cli")]
pub mod app;

// Core types (frame → utterance → outcome)
pub use audio::{AudioFrame, PcmChunk, Utterance, UtteranceBuffer, normalize};
pub use gateway::{
    SpeechRecognizer, SpeechSynthesizer, SynthesisGateway, SynthesisOutcome, TranscriptResult,
    TranscriptionGateway, TranslationGateway, TranslationOutcome, Translator,
};

// Session and render loop
pub use pipeline::{LanguagePair, Renderer, ResultChannel, Session, SessionConfig};
pub use transport::{ConnectionMonitor, ConnectionState, FrameSource};

// Error handling
pub use error::{GatewayError, GistingError, Result};

// Config
pub use config::Config;

// Diagnostics
pub use pipeline::error::{ErrorReporter, StationError};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
