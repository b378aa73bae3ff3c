//! Default configuration constants for gisting.
//!
//! Shared between the config types, the CLI and the pipeline so the
//! same numbers are not repeated in several places.

/// Default spoken language code.
pub const SOURCE_LANGUAGE: &str = "en";

/// Default translation target language code.
pub const TARGET_LANGUAGE: &str = "fr";

/// Source language value that lets the translation service detect the language.
pub const AUTO_LANGUAGE: &str = "auto";

/// Duration of one replayed transport frame in milliseconds.
///
/// WebRTC audio tracks deliver 20ms packets; replayed files use the same size.
pub const FRAME_MS: u32 = 20;

/// RMS level (0.0 to 1.0 on the normalized scale) above which a chunk counts as speech.
pub const SILENCE_THRESHOLD: f32 = 0.02;

/// Trailing silence in milliseconds that closes an utterance.
pub const SILENCE_MS: u32 = 700;

/// Upper bound on a single utterance in milliseconds, regardless of policy.
pub const MAX_UTTERANCE_MS: u32 = 15_000;

/// Span used by the fixed-duration boundary policy.
pub const FIXED_UTTERANCE_MS: u32 = 3_000;

/// Minimum RMS energy for an utterance to be worth sending to a recognizer.
///
/// Set far below the speech threshold so only truly silent spans are skipped.
pub const MIN_ENERGY_FOR_TRANSCRIPTION: f32 = 0.001;

/// Number of transcription worker threads per session.
pub const TRANSCRIPTION_WORKERS: usize = 2;

/// Utterances allowed to wait for a worker before new ones are dropped.
pub const QUEUE_DEPTH: usize = 8;

/// Per-call timeout for every external service, in seconds.
pub const GATEWAY_TIMEOUT_SECS: u64 = 15;

/// Bounded wait of one render cycle on the result channel, in milliseconds.
pub const POLL_MS: u64 = 1000;

/// Text shown in place of a transcript the recognizer could not produce.
pub const UNRECOGNIZED_NOTICE: &str = "[Could not transcribe speech]";

/// OpenAI-compatible transcription endpoint base.
pub const STT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Transcription model requested from the HTTP recognizer.
pub const STT_MODEL: &str = "whisper-1";

/// LibreTranslate-compatible translation endpoint.
pub const TRANSLATE_ENDPOINT: &str = "https://libretranslate.com/translate";

/// Text-to-speech endpoint returning MP3 audio.
pub const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";
