//! Utterance boundary policies.
//!
//! Decides, chunk by chunk, when the buffered audio forms a complete
//! recognition unit. The detector only sees levels and durations; the
//! buffer itself is owned by the session.

use crate::defaults;

/// When to close the utterance being buffered.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryPolicy {
    /// Every transport frame becomes its own utterance.
    PerFrame,
    /// Close once the buffer holds at least `ms` of audio.
    FixedDuration { ms: u32 },
    /// Close after `silence_ms` of quiet following speech, or at `max_ms`.
    /// Spans that never rise above `threshold` are dropped.
    Silence {
        threshold: f32,
        silence_ms: u32,
        max_ms: u32,
    },
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        BoundaryPolicy::Silence {
            threshold: defaults::SILENCE_THRESHOLD,
            silence_ms: defaults::SILENCE_MS,
            max_ms: defaults::MAX_UTTERANCE_MS,
        }
    }
}

/// Decision after observing one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Keep buffering.
    Continue,
    /// Flush the buffer as an utterance.
    Emit,
    /// Drop the buffer; it holds no speech.
    Discard,
}

/// Stateful evaluator for a [`BoundaryPolicy`].
#[derive(Debug, Clone)]
pub struct BoundaryDetector {
    policy: BoundaryPolicy,
    speech_seen: bool,
    trailing_silence_ms: u32,
}

impl BoundaryDetector {
    pub fn new(policy: BoundaryPolicy) -> Self {
        Self {
            policy,
            speech_seen: false,
            trailing_silence_ms: 0,
        }
    }

    pub fn policy(&self) -> &BoundaryPolicy {
        &self.policy
    }

    /// Observe a chunk that has just been buffered.
    ///
    /// `level` is the chunk RMS, `chunk_ms` its duration and `buffered_ms`
    /// the buffer duration including the chunk.
    pub fn observe(&mut self, level: f32, chunk_ms: u32, buffered_ms: u32) -> Boundary {
        let decision = match self.policy {
            BoundaryPolicy::PerFrame => Boundary::Emit,
            BoundaryPolicy::FixedDuration { ms } => {
                if buffered_ms >= ms {
                    Boundary::Emit
                } else {
                    Boundary::Continue
                }
            }
            BoundaryPolicy::Silence {
                threshold,
                silence_ms,
                max_ms,
            } => {
                if level >= threshold {
                    self.speech_seen = true;
                    self.trailing_silence_ms = 0;
                } else {
                    self.trailing_silence_ms = self.trailing_silence_ms.saturating_add(chunk_ms);
                }

                if self.speech_seen {
                    if self.trailing_silence_ms >= silence_ms || buffered_ms >= max_ms {
                        Boundary::Emit
                    } else {
                        Boundary::Continue
                    }
                } else if self.trailing_silence_ms >= silence_ms || buffered_ms >= max_ms {
                    Boundary::Discard
                } else {
                    Boundary::Continue
                }
            }
        };

        if decision != Boundary::Continue {
            self.reset();
        }
        decision
    }

    /// Forget speech/silence history, e.g. after the buffer was flushed elsewhere.
    pub fn reset(&mut self) {
        self.speech_seen = false;
        self.trailing_silence_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence_policy() -> BoundaryPolicy {
        BoundaryPolicy::Silence {
            threshold: 0.1,
            silence_ms: 60,
            max_ms: 200,
        }
    }

    #[test]
    fn per_frame_always_emits() {
        let mut detector = BoundaryDetector::new(BoundaryPolicy::PerFrame);
        assert_eq!(detector.observe(0.0, 20, 20), Boundary::Emit);
        assert_eq!(detector.observe(0.9, 20, 20), Boundary::Emit);
    }

    #[test]
    fn fixed_duration_waits_for_span() {
        let mut detector = BoundaryDetector::new(BoundaryPolicy::FixedDuration { ms: 60 });
        assert_eq!(detector.observe(0.5, 20, 20), Boundary::Continue);
        assert_eq!(detector.observe(0.5, 20, 40), Boundary::Continue);
        assert_eq!(detector.observe(0.5, 20, 60), Boundary::Emit);
    }

    #[test]
    fn silence_after_speech_emits() {
        let mut detector = BoundaryDetector::new(silence_policy());
        assert_eq!(detector.observe(0.5, 20, 20), Boundary::Continue);
        assert_eq!(detector.observe(0.0, 20, 40), Boundary::Continue);
        assert_eq!(detector.observe(0.0, 20, 60), Boundary::Continue);
        assert_eq!(detector.observe(0.0, 20, 80), Boundary::Emit);
    }

    #[test]
    fn speech_resets_trailing_silence() {
        let mut detector = BoundaryDetector::new(silence_policy());
        detector.observe(0.5, 20, 20);
        detector.observe(0.0, 20, 40);
        detector.observe(0.0, 20, 60);
        assert_eq!(detector.observe(0.5, 20, 80), Boundary::Continue);
        assert_eq!(detector.observe(0.0, 20, 100), Boundary::Continue);
    }

    #[test]
    fn silence_without_speech_is_discarded() {
        let mut detector = BoundaryDetector::new(silence_policy());
        assert_eq!(detector.observe(0.0, 20, 20), Boundary::Continue);
        assert_eq!(detector.observe(0.0, 20, 40), Boundary::Continue);
        assert_eq!(detector.observe(0.0, 20, 60), Boundary::Discard);
    }

    #[test]
    fn continuous_speech_is_capped_at_max() {
        let mut detector = BoundaryDetector::new(silence_policy());
        let mut buffered = 0;
        let mut decisions = Vec::new();
        for _ in 0..10 {
            buffered += 20;
            decisions.push(detector.observe(0.5, 20, buffered));
        }
        assert_eq!(decisions[9], Boundary::Emit);
        assert!(decisions[..9].iter().all(|d| *d == Boundary::Continue));
    }

    #[test]
    fn detector_resets_after_decision() {
        let mut detector = BoundaryDetector::new(silence_policy());
        detector.observe(0.5, 20, 20);
        detector.observe(0.0, 60, 80);
        // Fresh state: silence alone is not an emit
        assert_eq!(detector.observe(0.0, 20, 20), Boundary::Continue);
    }
}
