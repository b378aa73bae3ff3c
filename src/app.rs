//! Translation session entry point.
//!
//! Wires the complete flow for one replayed connection:
//! transport → session → workers → render loop

use crate::audio::WavFrameSource;
use crate::config::{BoundaryKind, Config, RecognizerBackend, TranscriptionConfig};
use crate::defaults;
use crate::error::{GistingError, Result};
use crate::gateway::{
    CommandRecognizer, HttpRecognizer, HttpSynthesizer, HttpTranslator, MockRecognizer,
    SpeechRecognizer, SynthesisGateway, TranscriptionGateway, TranslationGateway,
};
use crate::languages::{self, LANGUAGES};
use crate::output::TerminalSink;
use crate::pipeline::{
    ErrorReporter, LanguagePair, LogReporter, NullReporter, Renderer, Session, SessionConfig,
};
use crate::transport::{ConnectionMonitor, WavTransport};
use owo_colors::OwoColorize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Command-line overrides for one translation session.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// WAV input; `-` reads stdin.
    pub input: PathBuf,
    pub from: Option<String>,
    pub to: Option<String>,
    pub realtime: bool,
    pub output_dir: Option<PathBuf>,
    pub frame: Option<Duration>,
    pub poll: Option<Duration>,
    pub boundary: Option<BoundaryKind>,
    pub backend: Option<RecognizerBackend>,
    pub quiet: bool,
    pub verbosity: u8,
}

/// Totals reported when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub utterances: u64,
    pub dropped: u64,
    pub rendered: u64,
}

/// The three gateway adapters a session needs.
pub struct Gateways {
    pub transcription: TranscriptionGateway,
    pub translation: TranslationGateway,
    pub synthesis: SynthesisGateway,
}

/// Resolve a language name or code to its code. `auto` passes through when allowed.
fn resolve_code(value: &str, allow_auto: bool) -> Result<String> {
    if allow_auto && value.eq_ignore_ascii_case(defaults::AUTO_LANGUAGE) {
        return Ok(defaults::AUTO_LANGUAGE.to_string());
    }
    Ok(languages::resolve(value)?.code.to_string())
}

/// Fold command-line overrides into the loaded configuration.
pub fn apply_overrides(config: &mut Config, options: &TranslateOptions) {
    if let Some(from) = &options.from {
        config.languages.source = from.clone();
    }
    if let Some(to) = &options.to {
        config.languages.target = to.clone();
    }
    if let Some(dir) = &options.output_dir {
        config.render.output_dir = Some(dir.clone());
    }
    if let Some(poll) = options.poll {
        config.render.poll_ms = poll.as_millis() as u64;
    }
    if let Some(boundary) = options.boundary {
        config.audio.boundary = boundary;
    }
    if let Some(backend) = options.backend {
        config.transcription.backend = backend;
    }
}

/// Build the configured speech recognizer.
pub fn create_recognizer(
    config: &TranscriptionConfig,
    reporter: Arc<dyn ErrorReporter>,
) -> Result<Arc<dyn SpeechRecognizer>> {
    let recognizer: Arc<dyn SpeechRecognizer> = match config.backend {
        RecognizerBackend::Http => Arc::new(HttpRecognizer::new(
            &config.endpoint,
            &config.model,
            config.api_key.clone(),
            config.timeout(),
        )?),
        RecognizerBackend::Command => {
            Arc::new(CommandRecognizer::new(&config.command)?.with_reporter(reporter))
        }
        RecognizerBackend::Mock => Arc::new(MockRecognizer::new()),
    };
    Ok(recognizer)
}

/// Build all three gateways from configuration.
pub fn create_gateways(config: &Config, reporter: Arc<dyn ErrorReporter>) -> Result<Gateways> {
    let recognizer = create_recognizer(&config.transcription, reporter.clone())?;
    let translator = HttpTranslator::new(
        &config.translation.endpoint,
        config.translation.api_key.clone(),
        config.translation.timeout(),
    )?;
    let synthesizer = HttpSynthesizer::new(&config.synthesis.endpoint, config.synthesis.timeout())?;

    Ok(Gateways {
        transcription: TranscriptionGateway::new(recognizer)
            .with_min_energy(config.audio.min_energy)
            .with_reporter(reporter.clone()),
        translation: TranslationGateway::new(Arc::new(translator)).with_reporter(reporter.clone()),
        synthesis: SynthesisGateway::new(Arc::new(synthesizer)).with_reporter(reporter),
    })
}

fn open_input(input: &Path, frame_ms: u32) -> Result<WavFrameSource> {
    if input.as_os_str() == "-" {
        return WavFrameSource::from_stdin(frame_ms);
    }
    let file = File::open(input).map_err(|e| GistingError::Wav {
        message: format!("Failed to open {}: {}", input.display(), e),
    })?;
    WavFrameSource::from_reader(Box::new(BufReader::new(file)), frame_ms)
}

/// Run one session over already-built gateways.
///
/// The transport runs on the calling thread and the render loop on its own
/// thread; they share only the session's result channel.
pub fn run_session(
    config: &Config,
    gateways: Gateways,
    mut transport: WavTransport,
    reporter: Arc<dyn ErrorReporter>,
    quiet: bool,
    verbosity: u8,
) -> Result<SessionSummary> {
    let languages = LanguagePair {
        source: resolve_code(&config.languages.source, true)?,
        target: resolve_code(&config.languages.target, false)?,
    };

    let session = Arc::new(Session::with_reporter(
        SessionConfig {
            boundary: config.audio.boundary_policy(),
            languages,
            workers: config.transcription.workers,
            queue_depth: config.transcription.queue_depth,
            verbosity,
        },
        gateways.transcription,
        reporter,
    ));
    let watcher = session.follow_connection(transport.monitor().subscribe())?;

    let results = session.results();
    let mut renderer = Renderer::new(gateways.translation, gateways.synthesis)
        .with_poll(Duration::from_millis(config.render.poll_ms));
    let mut sink =
        TerminalSink::new(quiet, verbosity).with_output_dir(config.render.output_dir.clone());
    let render_loop = thread::Builder::new()
        .name("gisting-render".to_string())
        .spawn(move || renderer.run(&results, &mut sink))?;

    let start = Instant::now();
    let replayed = transport.run(|frame| session.on_frame(frame));
    let finished = session.finish();
    transport.close();

    let rendered = render_loop
        .join()
        .map_err(|_| GistingError::Other("render loop panicked".to_string()))??;
    watcher
        .join()
        .map_err(|_| GistingError::Other("connection watcher panicked".to_string()))?;
    replayed?;
    finished?;

    let stats = session.stats();
    let summary = SessionSummary {
        frames: stats.frames,
        utterances: stats.utterances,
        dropped: stats.dropped,
        rendered,
    };

    if !quiet && verbosity >= 1 {
        eprintln!(
            "Session: {} frames, {} utterances ({} dropped), {} rendered in {:.1}s",
            summary.frames,
            summary.utterances,
            summary.dropped,
            summary.rendered,
            start.elapsed().as_secs_f32()
        );
    }

    Ok(summary)
}

/// Run the translate command: replay WAV → transcribe → translate → speak.
pub fn run_translate_command(mut config: Config, options: TranslateOptions) -> Result<SessionSummary> {
    apply_overrides(&mut config, &options);
    config.validate()?;

    let reporter: Arc<dyn ErrorReporter> = if options.quiet {
        Arc::new(NullReporter)
    } else {
        Arc::new(LogReporter)
    };

    let frame_ms = options
        .frame
        .map(|d| d.as_millis() as u32)
        .unwrap_or(defaults::FRAME_MS)
        .max(1);
    let source = open_input(&options.input, frame_ms)?;

    if !options.quiet && options.verbosity >= 1 {
        eprintln!("gisting {}", crate::version_string());
    }
    if !options.quiet {
        eprintln!(
            "{} {} → {} ({} Hz, {} ch, {} recognizer)",
            "Translating".green(),
            languages::display_name(&config.languages.source),
            languages::display_name(&config.languages.target),
            source.sample_rate(),
            source.channels(),
            format!("{:?}", config.transcription.backend).to_lowercase()
        );
    }

    let gateways = create_gateways(&config, reporter.clone())?;
    let monitor = Arc::new(ConnectionMonitor::new());
    let transport = WavTransport::new(source, monitor).with_realtime(options.realtime);

    run_session(
        &config,
        gateways,
        transport,
        reporter,
        options.quiet,
        options.verbosity,
    )
}

/// Print the language table with speech support per language.
pub fn print_languages() {
    println!("Languages:");
    for language in LANGUAGES {
        let speech = if languages::synthesis_supported(language.code) {
            "speech".green().to_string()
        } else {
            "text only".yellow().to_string()
        };
        println!("  {:<10} {:<6} {}", language.name, language.code, speech);
    }
}
