//! Per-connection session: the frame callback, the utterance buffer and the
//! language selection, wired to the worker pool and the result channel.

use crate::audio::{Boundary, BoundaryDetector, BoundaryPolicy, UtteranceBuffer, normalize};
use crate::audio::AudioFrame;
use crate::defaults;
use crate::error::{GistingError, Result};
use crate::gateway::TranscriptionGateway;
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::pipeline::mailbox::ResultChannel;
use crate::pipeline::worker::{Job, Transcript, WorkerContext, WorkerPool};
use crate::transport::ConnectionState;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tokio::sync::watch;

const STATION: &str = "session";

/// Spoken language and translation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self::new(defaults::SOURCE_LANGUAGE, defaults::TARGET_LANGUAGE)
    }
}

/// Session tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub boundary: BoundaryPolicy,
    pub languages: LanguagePair,
    pub workers: usize,
    pub queue_depth: usize,
    pub verbosity: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            boundary: BoundaryPolicy::default(),
            languages: LanguagePair::default(),
            workers: defaults::TRANSCRIPTION_WORKERS,
            queue_depth: defaults::QUEUE_DEPTH,
            verbosity: 0,
        }
    }
}

/// Counters for the end-of-session summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub utterances: u64,
    pub dropped: u64,
}

/// State touched only by the frame callback.
struct Producer {
    buffer: UtteranceBuffer,
    detector: BoundaryDetector,
    /// Languages of the utterance currently being buffered.
    captured: Option<LanguagePair>,
}

/// One connected client.
///
/// The frame callback and the render loop share nothing but the result
/// channel. Language changes apply from the next utterance on.
pub struct Session {
    producer: Mutex<Producer>,
    languages: Mutex<LanguagePair>,
    jobs: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Option<WorkerPool>>,
    results: Arc<ResultChannel<Transcript>>,
    generation: Arc<AtomicU64>,
    connected: AtomicBool,
    frames: AtomicU64,
    utterances: AtomicU64,
    dropped: AtomicU64,
    reporter: Arc<dyn ErrorReporter>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Session {
    /// Start a session for a freshly connected transport.
    pub fn new(config: SessionConfig, gateway: TranscriptionGateway) -> Self {
        Self::with_reporter(config, gateway, Arc::new(LogReporter))
    }

    pub fn with_reporter(
        config: SessionConfig,
        gateway: TranscriptionGateway,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let results = Arc::new(ResultChannel::new());
        let generation = Arc::new(AtomicU64::new(0));
        let (tx, rx) = crossbeam_channel::bounded(config.queue_depth.max(1));

        let workers = WorkerPool::spawn(
            config.workers,
            rx,
            WorkerContext {
                gateway,
                results: results.clone(),
                generation: generation.clone(),
                reporter: reporter.clone(),
                verbosity: config.verbosity,
            },
        );

        Self::assemble(config, tx, Some(workers), results, generation, reporter)
    }

    fn assemble(
        config: SessionConfig,
        jobs: Sender<Job>,
        workers: Option<WorkerPool>,
        results: Arc<ResultChannel<Transcript>>,
        generation: Arc<AtomicU64>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            producer: Mutex::new(Producer {
                buffer: UtteranceBuffer::new(),
                detector: BoundaryDetector::new(config.boundary),
                captured: None,
            }),
            languages: Mutex::new(config.languages),
            jobs: Mutex::new(Some(jobs)),
            workers: Mutex::new(workers),
            results,
            generation,
            connected: AtomicBool::new(true),
            frames: AtomicU64::new(0),
            utterances: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            reporter,
        }
    }

    /// Consumer side of the result channel.
    pub fn results(&self) -> Arc<ResultChannel<Transcript>> {
        self.results.clone()
    }

    pub fn languages(&self) -> LanguagePair {
        lock(&self.languages).clone()
    }

    /// Change languages. The utterance being buffered keeps the pair it started with.
    pub fn set_languages(&self, languages: LanguagePair) {
        *lock(&self.languages) = languages;
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames: self.frames.load(Ordering::Relaxed),
            utterances: self.utterances.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Frame callback. Never blocks on recognition and hands the frame back
    /// unchanged for local echo.
    pub fn on_frame(&self, frame: AudioFrame) -> AudioFrame {
        if !self.is_connected() {
            return frame;
        }
        self.frames.fetch_add(1, Ordering::Relaxed);

        let chunk = match normalize(&frame) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.reporter.report(
                    STATION,
                    &StationError::Recoverable(format!("frame {} skipped: {}", frame.sequence, e)),
                );
                return frame;
            }
        };
        if chunk.samples.is_empty() {
            return frame;
        }

        let level = chunk.rms();
        let chunk_ms = chunk.duration_ms();

        let mut ready = Vec::new();
        let generation;
        {
            let mut producer = lock(&self.producer);
            // Disconnect flips the flag under this lock; jobs carry the
            // generation seen here
            if !self.is_connected() {
                return frame;
            }
            generation = self.generation.load(Ordering::SeqCst);

            let current = producer
                .captured
                .take()
                .unwrap_or_else(|| self.languages());

            if let Some(previous) = producer.buffer.push(chunk) {
                // Rate change closed the previous utterance; the new chunk starts another
                producer.detector.reset();
                ready.push((previous, current));
                producer.captured = Some(self.languages());
            } else {
                producer.captured = Some(current);
            }

            let buffered_ms = producer.buffer.duration_ms();
            match producer.detector.observe(level, chunk_ms, buffered_ms) {
                Boundary::Continue => {}
                Boundary::Emit => {
                    let languages = producer.captured.take().unwrap_or_else(|| self.languages());
                    if let Some(utterance) = producer.buffer.flush() {
                        ready.push((utterance, languages));
                    }
                }
                Boundary::Discard => {
                    producer.buffer.discard();
                    producer.captured = None;
                }
            }
        }

        for (utterance, languages) in ready {
            self.enqueue(Job {
                utterance,
                languages,
                generation,
            });
        }
        frame
    }

    fn enqueue(&self, job: Job) {
        let jobs = lock(&self.jobs);
        let Some(tx) = jobs.as_ref() else {
            return;
        };

        let sequence = job.utterance.sequence();
        match tx.try_send(job) {
            Ok(()) => {
                self.utterances.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.reporter.report(
                    STATION,
                    &StationError::Recoverable(format!(
                        "transcription queue full, dropped utterance {}",
                        sequence
                    )),
                );
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Transport went away: drop buffered audio unflushed and ignore any
    /// recognition still in flight.
    pub fn disconnect(&self) {
        {
            let mut producer = lock(&self.producer);
            if !self.connected.swap(false, Ordering::SeqCst) {
                return;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            producer.buffer.discard();
            producer.detector.reset();
            producer.captured = None;
        }
        lock(&self.jobs).take();
        self.results.close();
    }

    /// End of input: flush the partial utterance, wait for every queued
    /// recognition and close the result channel.
    pub fn finish(&self) -> Result<()> {
        let tail = {
            let mut producer = lock(&self.producer);
            if self.connected.swap(false, Ordering::SeqCst) {
                let languages = producer.captured.take().unwrap_or_else(|| self.languages());
                producer.detector.reset();
                producer
                    .buffer
                    .flush()
                    .map(|u| (u, languages, self.generation.load(Ordering::SeqCst)))
            } else {
                None
            }
        };

        if let Some(tx) = lock(&self.jobs).take()
            && let Some((utterance, languages, generation)) = tail
        {
            let job = Job {
                utterance,
                languages,
                generation,
            };
            // Off the frame path, so waiting for room is fine
            if tx.send(job).is_ok() {
                self.utterances.fetch_add(1, Ordering::Relaxed);
            }
        }

        let workers = lock(&self.workers).take();
        let joined = match workers {
            Some(pool) => pool.join().map_err(|message| {
                self.reporter
                    .report(STATION, &StationError::Fatal(message.clone()));
                GistingError::Other(message)
            }),
            None => Ok(()),
        };
        self.results.close();
        joined
    }

    /// Follow a transport's connection state on a background thread and
    /// disconnect when it reports `Disconnected`.
    pub fn follow_connection(
        self: &Arc<Self>,
        mut states: watch::Receiver<ConnectionState>,
    ) -> Result<JoinHandle<()>> {
        let session = Arc::clone(self);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| GistingError::Other(format!("connection watcher runtime: {}", e)))?;

        let handle = thread::Builder::new()
            .name("gisting-connection".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    loop {
                        if *states.borrow_and_update() == ConnectionState::Disconnected {
                            session.disconnect();
                            break;
                        }
                        if states.changed().await.is_err() {
                            break;
                        }
                    }
                });
            })?;
        Ok(handle)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Workers exit once the queue has no sender
        lock(&self.jobs).take();
        self.results.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::{MockRecognizer, SpeechRecognizer, TranscriptResult};
    use crate::pipeline::error::{MemoryReporter, NullReporter};
    use crate::transport::ConnectionMonitor;
    use std::time::Duration;

    fn loud_frame(rate: u32, ms: u32) -> AudioFrame {
        let n = (rate * ms / 1000) as usize;
        let samples = (0..n).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        AudioFrame::new(samples, 1, rate)
    }

    fn session(policy: BoundaryPolicy, response: &str) -> (Session, Arc<MemoryReporter>) {
        let reporter = Arc::new(MemoryReporter::new());
        let gateway =
            TranscriptionGateway::new(Arc::new(MockRecognizer::new().with_response(response)))
                .with_reporter(reporter.clone());
        let config = SessionConfig {
            boundary: policy,
            workers: 1,
            ..SessionConfig::default()
        };
        (Session::with_reporter(config, gateway, reporter.clone()), reporter)
    }

    #[test]
    fn frame_is_returned_unchanged() {
        let (session, _) = session(BoundaryPolicy::FixedDuration { ms: 1000 }, "x");
        let frame = loud_frame(16000, 20).with_sequence(9);
        let echoed = session.on_frame(frame.clone());
        assert_eq!(echoed, frame);
        assert_eq!(session.stats().frames, 1);
    }

    #[test]
    fn per_frame_policy_transcribes_each_frame() {
        let (session, _) = session(BoundaryPolicy::PerFrame, "hello");
        session.on_frame(loud_frame(16000, 20));

        let transcript = session.results().try_take(Duration::from_secs(5)).unwrap();
        assert_eq!(
            transcript.result,
            TranscriptResult::Recognized("hello".to_string())
        );
        assert_eq!(transcript.languages, LanguagePair::default());
    }

    #[test]
    fn language_change_applies_from_next_utterance() {
        let (session, _) = session(BoundaryPolicy::FixedDuration { ms: 40 }, "x");
        let results = session.results();

        session.on_frame(loud_frame(16000, 20));
        session.set_languages(LanguagePair::new("de", "ja"));
        session.on_frame(loud_frame(16000, 20));
        let first = results.try_take(Duration::from_secs(5)).unwrap();
        assert_eq!(first.languages, LanguagePair::default());

        session.on_frame(loud_frame(16000, 20));
        session.on_frame(loud_frame(16000, 20));
        let second = results.try_take(Duration::from_secs(5)).unwrap();
        assert_eq!(second.languages, LanguagePair::new("de", "ja"));
    }

    #[test]
    fn rate_change_emits_previous_utterance() {
        let (session, _) = session(BoundaryPolicy::FixedDuration { ms: 10_000 }, "x");
        session.on_frame(loud_frame(16000, 20));
        session.on_frame(loud_frame(48000, 20));
        assert_eq!(session.stats().utterances, 1);
        assert!(session.results().try_take(Duration::from_secs(5)).is_some());
    }

    #[test]
    fn invalid_frame_is_reported_and_passed_through() {
        let (session, reporter) = session(BoundaryPolicy::PerFrame, "x");
        let bad = AudioFrame::new(vec![0.1, 0.2, 0.3], 2, 16000);
        let echoed = session.on_frame(bad.clone());
        assert_eq!(echoed, bad);
        assert!(reporter.contains(STATION, "skipped"));
        assert_eq!(session.stats().utterances, 0);
    }

    #[test]
    fn disconnect_discards_buffer_without_flushing() {
        let (session, _) = session(BoundaryPolicy::FixedDuration { ms: 10_000 }, "x");
        let results = session.results();
        session.on_frame(loud_frame(16000, 20));
        session.disconnect();

        assert!(!session.is_connected());
        assert_eq!(session.stats().utterances, 0);
        assert_eq!(results.try_take(Duration::from_millis(50)), None);
        assert!(results.is_closed());

        // Frames after disconnect are passed through untouched
        session.on_frame(loud_frame(16000, 20));
        assert_eq!(session.stats().frames, 1);
    }

    #[test]
    fn finish_flushes_partial_utterance() {
        let (session, _) = session(BoundaryPolicy::FixedDuration { ms: 10_000 }, "tail");
        let results = session.results();
        session.on_frame(loud_frame(16000, 20));
        session.finish().unwrap();

        let transcript = results.take().unwrap();
        assert_eq!(transcript.result.text(), Some("tail"));
        assert!(results.is_closed());
    }

    #[test]
    fn connection_watcher_disconnects_session() {
        let (session, _) = session(BoundaryPolicy::PerFrame, "x");
        let session = Arc::new(session);
        let monitor = ConnectionMonitor::new();
        monitor.set(ConnectionState::Connected);

        let watcher = session.follow_connection(monitor.subscribe()).unwrap();
        monitor.set(ConnectionState::Disconnected);
        watcher.join().unwrap();

        assert!(!session.is_connected());
    }

    #[test]
    fn jobs_racing_disconnect_keep_the_retired_generation() {
        for _ in 0..20 {
            let (tx, rx) = crossbeam_channel::bounded(4096);
            let session = Arc::new(Session::assemble(
                SessionConfig {
                    boundary: BoundaryPolicy::PerFrame,
                    ..SessionConfig::default()
                },
                tx,
                None,
                Arc::new(ResultChannel::new()),
                Arc::new(AtomicU64::new(0)),
                Arc::new(NullReporter),
            ));

            let producer = {
                let session = session.clone();
                thread::spawn(move || {
                    for seq in 0..2000 {
                        session.on_frame(loud_frame(16000, 20).with_sequence(seq));
                    }
                })
            };
            thread::sleep(Duration::from_micros(300));
            session.disconnect();
            producer.join().unwrap();

            let current = session.generation.load(Ordering::SeqCst);
            assert_eq!(current, 1);
            let stamped: Vec<u64> = rx.try_iter().map(|job| job.generation).collect();
            assert!(
                stamped.iter().all(|g| *g < current),
                "job stamped with the post-disconnect generation"
            );
        }
    }

    struct PanickingRecognizer;

    impl SpeechRecognizer for PanickingRecognizer {
        fn recognize(&self, _wav: &[u8], _language: &str) -> std::result::Result<String, GatewayError> {
            panic!("recognizer blew up");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[test]
    fn finish_reports_fatal_when_a_worker_died() {
        let reporter = Arc::new(MemoryReporter::new());
        let session = Session::with_reporter(
            SessionConfig {
                boundary: BoundaryPolicy::PerFrame,
                workers: 1,
                ..SessionConfig::default()
            },
            TranscriptionGateway::new(Arc::new(PanickingRecognizer)),
            reporter.clone(),
        );
        session.on_frame(loud_frame(16000, 20));

        assert!(session.finish().is_err());
        assert!(
            reporter
                .reports()
                .iter()
                .any(|(station, e)| station == STATION && matches!(e, StationError::Fatal(_)))
        );
        assert!(session.results().is_closed());
    }
}
