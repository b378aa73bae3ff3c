//! Language selection table and speech-synthesis coverage.

use crate::error::{GistingError, Result};

/// A selectable language: display name and the code sent to the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
}

/// Languages offered for both the spoken and the target side.
pub const LANGUAGES: &[Language] = &[
    Language { name: "English", code: "en" },
    Language { name: "French", code: "fr" },
    Language { name: "Spanish", code: "es" },
    Language { name: "German", code: "de" },
    Language { name: "Hindi", code: "hi" },
    Language { name: "Tamil", code: "ta" },
    Language { name: "Telugu", code: "te" },
    Language { name: "Japanese", code: "ja" },
    Language { name: "Russian", code: "ru" },
    Language { name: "Yoruba", code: "yo" },
    Language { name: "Igbo", code: "ig" },
    Language { name: "Chinese", code: "zh-cn" },
];

/// Codes the speech synthesis service can voice.
const SYNTHESIS_CODES: &[&str] = &[
    "af", "am", "ar", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es", "et",
    "eu", "fi", "fr", "fr-ca", "gl", "gu", "ha", "hi", "hr", "hu", "id", "is", "it", "iw", "ja",
    "jw", "km", "kn", "ko", "la", "lt", "lv", "ml", "mr", "ms", "my", "ne", "nl", "no", "pa",
    "pl", "pt", "pt-pt", "ro", "ru", "si", "sk", "sq", "sr", "su", "sv", "sw", "ta", "te", "th",
    "tl", "tr", "uk", "ur", "vi", "yue", "zh", "zh-cn", "zh-tw",
];

/// Resolve a display name or a code (both case-insensitive) to a table entry.
pub fn resolve(name_or_code: &str) -> Result<&'static Language> {
    let needle = name_or_code.trim();
    LANGUAGES
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(needle) || l.name.eq_ignore_ascii_case(needle))
        .ok_or_else(|| GistingError::UnknownLanguage(needle.to_string()))
}

/// Display name for a code, falling back to the code itself.
pub fn display_name(code: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(code))
        .map(|l| l.name)
        .unwrap_or(code)
}

/// Whether the synthesis service can speak `code`.
pub fn synthesis_supported(code: &str) -> bool {
    SYNTHESIS_CODES.iter().any(|c| c.eq_ignore_ascii_case(code))
}
