//! Transcription workers.
//!
//! Utterances are handed off by the frame callback through a bounded queue and
//! recognized on dedicated threads, so a slow recognizer never delays frame
//! delivery. Workers share one receiver; completion order is not preserved.

use crate::audio::Utterance;
use crate::gateway::{TranscriptResult, TranscriptionGateway};
use crate::pipeline::error::{ErrorReporter, StationError};
use crate::pipeline::mailbox::ResultChannel;
use crate::pipeline::session::LanguagePair;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// One utterance waiting for recognition.
#[derive(Debug)]
pub struct Job {
    pub utterance: Utterance,
    /// Languages captured when the utterance started.
    pub languages: LanguagePair,
    /// Session generation the utterance belongs to.
    pub generation: u64,
}

/// A finished recognition, as delivered to the render loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub result: TranscriptResult,
    pub languages: LanguagePair,
    pub sequence: u64,
}

/// Everything a worker thread needs.
#[derive(Clone)]
pub struct WorkerContext {
    pub gateway: TranscriptionGateway,
    pub results: Arc<ResultChannel<Transcript>>,
    pub generation: Arc<AtomicU64>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub verbosity: u8,
}

/// A fixed set of worker threads draining one job queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers (at least one).
    pub fn spawn(count: usize, jobs: Receiver<Job>, context: WorkerContext) -> Self {
        let handles = (0..count.max(1))
            .map(|id| {
                let jobs = jobs.clone();
                let context = context.clone();
                thread::Builder::new()
                    .name(format!("gisting-worker-{}", id))
                    .spawn(move || run_worker(id, jobs, context))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    context.reporter.report(
                        "worker",
                        &StationError::Recoverable(format!("could not spawn worker: {}", e)),
                    );
                    None
                }
            })
            .collect();

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit. Workers exit once the job queue's
    /// senders are gone and the queue is empty.
    pub fn join(self) -> Result<(), String> {
        let mut panicked = 0;
        for handle in self.handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(format!("{} transcription worker(s) panicked", panicked));
        }
        Ok(())
    }
}

fn run_worker(id: usize, jobs: Receiver<Job>, context: WorkerContext) {
    while let Ok(job) = jobs.recv() {
        // Queued before a disconnect; nobody is listening any more
        if job.generation != context.generation.load(Ordering::SeqCst) {
            continue;
        }

        let sequence = job.utterance.sequence();
        let duration_ms = job.utterance.duration_ms();
        let start = Instant::now();
        let result = context
            .gateway
            .transcribe(job.utterance, &job.languages.source);

        if context.verbosity >= 2 {
            eprintln!(
                "  [worker {}] utterance {} ({}ms audio) transcribed in {}ms",
                id,
                sequence,
                duration_ms,
                start.elapsed().as_millis()
            );
        }

        // Resolved after a disconnect: drop it
        if job.generation != context.generation.load(Ordering::SeqCst) {
            continue;
        }

        context.results.put(Transcript {
            result,
            languages: job.languages,
            sequence,
        });
    }
}
