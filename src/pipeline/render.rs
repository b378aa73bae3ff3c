//! Consumer side: pull the latest transcript, translate it, voice it, render it.

use crate::error::Result;
use crate::gateway::{SynthesisGateway, SynthesisOutcome, TranslationGateway};
use crate::languages;
use crate::pipeline::mailbox::ResultChannel;
use crate::pipeline::session::LanguagePair;
use crate::pipeline::worker::Transcript;
use std::time::Duration;

/// Warning shown when the target language cannot be voiced.
pub fn unsupported_notice(code: &str) -> String {
    format!(
        "Speech not supported for language: {}",
        languages::display_name(code)
    )
}

/// Spoken form of the translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speech {
    /// MP3 bytes.
    Audio(Vec<u8>),
    /// Target language cannot be voiced; carries the language code.
    Unsupported(String),
    /// Synthesis was attempted and failed.
    Failed(String),
    /// Nothing to say (transcript was not understood).
    Skipped,
}

/// Everything one render shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Transcript or the not-understood notice.
    pub transcript: String,
    /// Translated text or the inline translation error; `None` when skipped.
    pub translation: Option<String>,
    pub speech: Speech,
    pub languages: LanguagePair,
    pub sequence: u64,
}

/// Pluggable output for rendered views.
pub trait RenderSink: Send {
    /// Show a newly adopted view.
    fn render(&mut self, view: &View) -> Result<()>;

    /// Called once the result channel has closed.
    fn finish(&mut self) {}

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Outcome of one render cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cycle {
    /// A new transcript was adopted and rendered into a fresh view.
    Updated(View),
    /// Nothing new; the displayed view stands.
    Unchanged,
    /// The session is over and nothing is left to take.
    Closed,
}

/// Render loop state. Owns what is currently displayed.
pub struct Renderer {
    translation: TranslationGateway,
    synthesis: SynthesisGateway,
    poll: Duration,
    current: Option<View>,
    rendered: u64,
}

impl Renderer {
    pub fn new(translation: TranslationGateway, synthesis: SynthesisGateway) -> Self {
        Self {
            translation,
            synthesis,
            poll: Duration::from_millis(crate::defaults::POLL_MS),
            current: None,
            rendered: 0,
        }
    }

    /// Bounded wait of each cycle on the result channel.
    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// The view currently on display.
    pub fn current(&self) -> Option<&View> {
        self.current.as_ref()
    }

    /// Number of views rendered so far.
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    /// Run one cycle: wait up to the poll interval and adopt the transcript
    /// only if its text differs from what is displayed.
    pub fn cycle(&mut self, results: &ResultChannel<Transcript>) -> Cycle {
        let Some(transcript) = results.try_take(self.poll) else {
            return if results.is_closed() {
                Cycle::Closed
            } else {
                Cycle::Unchanged
            };
        };

        let text = transcript.result.display_text();
        if self.current.as_ref().is_some_and(|v| v.transcript == text) {
            return Cycle::Unchanged;
        }

        let view = self.build(transcript);
        self.current = Some(view.clone());
        self.rendered += 1;
        Cycle::Updated(view)
    }

    /// Cycle until the result channel closes, handing each new view to `sink`.
    pub fn run(&mut self, results: &ResultChannel<Transcript>, sink: &mut dyn RenderSink) -> Result<u64> {
        loop {
            match self.cycle(results) {
                Cycle::Updated(view) => sink.render(&view)?,
                Cycle::Unchanged => {}
                Cycle::Closed => break,
            }
        }
        sink.finish();
        Ok(self.rendered)
    }

    fn build(&self, transcript: Transcript) -> View {
        let Transcript {
            result,
            languages,
            sequence,
        } = transcript;

        let Some(text) = result.text() else {
            return View {
                transcript: result.display_text().to_string(),
                translation: None,
                speech: Speech::Skipped,
                languages,
                sequence,
            };
        };

        let translated = self
            .translation
            .translate(text, &languages.source, &languages.target);

        let speech = match translated.text() {
            Some(spoken) if !spoken.is_empty() => {
                match self.synthesis.synthesize(spoken, &languages.target) {
                    SynthesisOutcome::Audio(bytes) => Speech::Audio(bytes),
                    SynthesisOutcome::Unsupported { language } => Speech::Unsupported(language),
                    SynthesisOutcome::Failed(message) => Speech::Failed(message),
                }
            }
            // Never voice an error message
            _ => Speech::Skipped,
        };

        View {
            transcript: text.to_string(),
            translation: Some(translated.display_text()),
            speech,
            languages,
            sequence,
        }
    }
}

/// Sink that keeps every view, for tests and library callers.
#[derive(Debug, Default)]
pub struct CollectorSink {
    views: Vec<View>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }
}

impl RenderSink for CollectorSink {
    fn render(&mut self, view: &View) -> Result<()> {
        self.views.push(view.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockSynthesizer, MockTranslator, TranscriptResult};
    use crate::pipeline::error::MemoryReporter;
    use std::sync::Arc;

    fn renderer(translator: MockTranslator, synthesizer: MockSynthesizer) -> Renderer {
        let reporter = Arc::new(MemoryReporter::new());
        Renderer::new(
            TranslationGateway::new(Arc::new(translator)).with_reporter(reporter.clone()),
            SynthesisGateway::new(Arc::new(synthesizer)).with_reporter(reporter),
        )
        .with_poll(Duration::from_millis(10))
    }

    fn transcript(text: &str, target: &str) -> Transcript {
        Transcript {
            result: TranscriptResult::Recognized(text.to_string()),
            languages: LanguagePair::new("en", target),
            sequence: 0,
        }
    }

    #[test]
    fn recognized_text_is_translated_and_voiced() {
        let mut renderer = renderer(
            MockTranslator::new().with_response("bonjour"),
            MockSynthesizer::new(),
        );
        let results = ResultChannel::new();
        results.put(transcript("hello", "fr"));

        let Cycle::Updated(view) = renderer.cycle(&results) else {
            panic!("expected a new view");
        };
        assert_eq!(view.transcript, "hello");
        assert_eq!(view.translation.as_deref(), Some("bonjour"));
        assert!(matches!(view.speech, Speech::Audio(ref bytes) if !bytes.is_empty()));
    }

    #[test]
    fn empty_poll_keeps_current_view() {
        let mut renderer = renderer(MockTranslator::new(), MockSynthesizer::new());
        let results = ResultChannel::new();
        results.put(transcript("hello", "fr"));
        assert!(matches!(renderer.cycle(&results), Cycle::Updated(_)));

        assert_eq!(renderer.cycle(&results), Cycle::Unchanged);
        assert_eq!(renderer.current().unwrap().transcript, "hello");
    }

    #[test]
    fn identical_transcript_is_not_adopted_again() {
        let mut renderer = renderer(MockTranslator::new(), MockSynthesizer::new());
        let results = ResultChannel::new();
        results.put(transcript("hello", "fr"));
        renderer.cycle(&results);
        results.put(transcript("hello", "fr"));
        assert_eq!(renderer.cycle(&results), Cycle::Unchanged);
        assert_eq!(renderer.rendered(), 1);
    }

    #[test]
    fn unrecognized_shows_notice_and_skips_services() {
        let mut renderer = renderer(
            MockTranslator::new().with_failure("must not be called"),
            MockSynthesizer::new().with_failure("must not be called"),
        );
        let results = ResultChannel::new();
        results.put(Transcript {
            result: TranscriptResult::Unrecognized,
            languages: LanguagePair::default(),
            sequence: 3,
        });

        let Cycle::Updated(view) = renderer.cycle(&results) else {
            panic!("expected a new view");
        };
        assert_eq!(view.transcript, crate::defaults::UNRECOGNIZED_NOTICE);
        assert_eq!(view.translation, None);
        assert_eq!(view.speech, Speech::Skipped);
    }

    #[test]
    fn translation_failure_is_inline_and_not_voiced() {
        let mut renderer = renderer(
            MockTranslator::new().with_failure("offline"),
            MockSynthesizer::new(),
        );
        let results = ResultChannel::new();
        results.put(transcript("hello", "fr"));

        let Cycle::Updated(view) = renderer.cycle(&results) else {
            panic!("expected a new view");
        };
        assert_eq!(
            view.translation.as_deref(),
            Some("[Translation Error: network error: offline]")
        );
        assert_eq!(view.speech, Speech::Skipped);
    }

    #[test]
    fn unsupported_target_is_marked() {
        let mut renderer = renderer(MockTranslator::new(), MockSynthesizer::new());
        let results = ResultChannel::new();
        results.put(transcript("hello", "yo"));

        let Cycle::Updated(view) = renderer.cycle(&results) else {
            panic!("expected a new view");
        };
        assert_eq!(view.speech, Speech::Unsupported("yo".to_string()));
        assert_eq!(
            unsupported_notice("yo"),
            "Speech not supported for language: Yoruba"
        );
    }

    #[test]
    fn run_stops_when_channel_closes() {
        let mut renderer = renderer(MockTranslator::new(), MockSynthesizer::new());
        let results = ResultChannel::new();
        results.put(transcript("last words", "de"));
        results.close();

        let mut sink = CollectorSink::new();
        let rendered = renderer.run(&results, &mut sink).unwrap();
        assert_eq!(rendered, 1);
        assert_eq!(sink.views()[0].translation.as_deref(), Some("[de] last words"));
    }
}
