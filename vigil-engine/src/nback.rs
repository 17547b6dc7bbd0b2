//! N-back memory screening (dementia detection)
//!
//! The most involved scoring machine: three escalating n-back levels, a
//! per-level threshold table, and a tri-state terminal signal. The machine
//! itself is pure state stepped by the scheduler; `run` drives it on the
//! wall-clock cadence and emits presentation events.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;
use tracing::debug;

use vigil_common::api::{FlagUpdateRequest, RecordSessionRequest};
use vigil_common::types::{DementiaMetrics, SessionMetrics};
use vigil_common::{Disease, SessionMode, Signal};

use crate::schedule::{
    CompletionLatch, Phase, DIGIT_BLANK, DIGIT_VISIBLE, EVALUATE_SETTLE, LEVEL_TRANSITION,
};
use crate::trial::{match_count, nback_sequence, NBACK_SEQUENCE_LEN};

/// Highest n-back level
pub const MAX_LEVEL: usize = 3;

/// Accuracy below this is Red regardless of level reached
pub const RED_CUTOFF: f64 = 50.0;

/// Advancement threshold per level. The top level's threshold doubles as its
/// pass threshold: clearing level 3 below it yields Yellow, never Green.
pub fn level_threshold(level: usize) -> f64 {
    match level {
        1 => 70.0,
        2 => 60.0,
        3 => 70.0,
        _ => 70.0,
    }
}

/// Per-level tally, kept for the summary record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelStats {
    pub correct: u32,
    pub attempts: u32,
    /// True matches available in the level's sequence
    pub matches: u32,
    /// Rounded percent, 0 when no attempts were made
    pub accuracy: u32,
}

/// Terminal summary of one n-back run
#[derive(Debug, Clone, PartialEq)]
pub struct NBackOutcome {
    pub reached_level: usize,
    pub signal: Signal,
    pub total_correct: u32,
    pub total_attempts: u32,
    pub total_matches: u32,
    /// Rounded accuracy of the final evaluated level
    pub accuracy: u32,
    pub user_stopped: bool,
    pub levels: [LevelStats; MAX_LEVEL],
}

impl NBackOutcome {
    /// Canonical session record for submission
    pub fn to_record(&self) -> RecordSessionRequest {
        RecordSessionRequest {
            disease_type: Disease::Dementia,
            mode: SessionMode::Detection,
            result: self.signal.to_string(),
            metrics: SessionMetrics::dementia(DementiaMetrics {
                correct_answers: Some(self.total_correct),
                attempts: Some(self.total_attempts),
                level_reached: Some(self.reached_level as u32),
                ..Default::default()
            }),
        }
    }

    /// Flag update implied by this outcome. Self-stopped runs are treated as
    /// inconclusive and never auto-flag; detection only ever sets the flag,
    /// clearing is therapy's responsibility.
    pub fn flag_update(&self) -> Option<FlagUpdateRequest> {
        if self.signal.needs_therapy() && !self.user_stopped {
            Some(FlagUpdateRequest::for_disease(Disease::Dementia, true))
        } else {
            None
        }
    }
}

/// Outcome of evaluating the active level
#[derive(Debug, Clone, PartialEq)]
pub enum LevelDecision {
    /// Advance to the given level after the transition pause
    Advance(usize),
    /// Run is over; exactly one caller observes this per run
    Finished(NBackOutcome),
}

/// Response to a match press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResponse {
    /// Press counted; `correct` says whether it was a true match
    Accepted { correct: bool },
    /// Blank phase, duplicate press, or pre-offset stimulus; no score effect
    Rejected,
}

/// The n-back detection state machine
#[derive(Debug)]
pub struct NBackTest {
    level: usize,
    sequence: Vec<u8>,
    phase: Phase,
    responded: bool,
    user_stopped: bool,
    level_correct: u32,
    level_attempts: u32,
    levels: [LevelStats; MAX_LEVEL],
    latch: CompletionLatch,
}

impl NBackTest {
    /// Start a run at level 1 with a freshly generated sequence
    pub fn new(rng: &mut impl Rng) -> Self {
        Self::with_sequence(1, nback_sequence(1, rng))
    }

    /// Start at a given level with a fixed sequence (deterministic harnesses)
    pub fn with_sequence(level: usize, sequence: Vec<u8>) -> Self {
        assert!((1..=MAX_LEVEL).contains(&level), "level must be in 1..={MAX_LEVEL}");
        assert_eq!(sequence.len(), NBACK_SEQUENCE_LEN);
        Self {
            level,
            sequence,
            phase: Phase::Presenting(0),
            responded: false,
            user_stopped: false,
            level_correct: 0,
            level_attempts: 0,
            levels: [LevelStats::default(); MAX_LEVEL],
            latch: CompletionLatch::new(),
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Digit currently on screen, None while blanked or after the sequence
    pub fn current_stimulus(&self) -> Option<u8> {
        self.phase.stimulus_index().map(|i| self.sequence[i])
    }

    /// Latch shared with the recorder so a racing stop cannot double-submit
    pub fn latch(&self) -> CompletionLatch {
        self.latch.clone()
    }

    /// Handle a "match" press. At most one press counts per exposure; presses
    /// during the blank or before the offset are dropped without error.
    pub fn press_match(&mut self) -> MatchResponse {
        let i = match self.phase {
            Phase::Presenting(i) => i,
            _ => return MatchResponse::Rejected,
        };
        if self.responded || i < self.level {
            return MatchResponse::Rejected;
        }
        self.responded = true;
        self.level_attempts += 1;
        let correct = self.sequence[i] == self.sequence[i - self.level];
        if correct {
            self.level_correct += 1;
        }
        MatchResponse::Accepted { correct }
    }

    /// Presenting -> Blanked at the end of the visible window
    pub fn begin_blank(&mut self) {
        if let Phase::Presenting(i) = self.phase {
            self.phase = Phase::Blanked(i);
        }
    }

    /// Blanked -> next stimulus, or Evaluating when the sequence is exhausted
    pub fn end_blank(&mut self) -> Phase {
        if let Phase::Blanked(i) = self.phase {
            if i + 1 < self.sequence.len() {
                self.phase = Phase::Presenting(i + 1);
                self.responded = false;
            } else {
                self.phase = Phase::Evaluating;
            }
        }
        self.phase
    }

    /// User-initiated stop: evaluate immediately over the trials observed so
    /// far and suppress automatic flagging for this run.
    pub fn stop(&mut self) {
        if !self.phase.is_terminal() {
            self.user_stopped = true;
            self.phase = Phase::Evaluating;
        }
    }

    /// Stop and resolve in one step (the manual-stop path)
    pub fn stop_and_evaluate(&mut self, rng: &mut impl Rng) -> Option<LevelDecision> {
        self.stop();
        self.evaluate(rng)
    }

    /// Resolve the active level once it has reached `Evaluating`.
    ///
    /// Accuracy at or above the level threshold advances (resetting per-level
    /// counters and generating the next sequence); anything else terminates
    /// the run with its signal. Termination is latched: concurrent callers
    /// racing into this method observe `Finished` exactly once.
    pub fn evaluate(&mut self, rng: &mut impl Rng) -> Option<LevelDecision> {
        if self.phase != Phase::Evaluating {
            return None;
        }

        let attempts = self.level_attempts;
        let accuracy = if attempts > 0 {
            f64::from(self.level_correct) / f64::from(attempts) * 100.0
        } else {
            0.0
        };
        self.levels[self.level - 1] = LevelStats {
            correct: self.level_correct,
            attempts,
            matches: match_count(&self.sequence, self.level) as u32,
            accuracy: accuracy.round() as u32,
        };

        if accuracy >= level_threshold(self.level) && self.level < MAX_LEVEL {
            let next = self.level + 1;
            self.level = next;
            self.sequence = nback_sequence(next, rng);
            self.level_correct = 0;
            self.level_attempts = 0;
            self.responded = false;
            self.user_stopped = false;
            self.phase = Phase::Presenting(0);
            debug!(level = next, "n-back advancing");
            return Some(LevelDecision::Advance(next));
        }

        if !self.latch.try_complete() {
            return None;
        }

        let signal = if accuracy < RED_CUTOFF {
            Signal::Red
        } else if self.level == MAX_LEVEL && accuracy >= level_threshold(MAX_LEVEL) {
            Signal::Green
        } else {
            Signal::Yellow
        };

        self.phase = Phase::Resolved;
        let outcome = NBackOutcome {
            reached_level: self.level,
            signal,
            total_correct: self.levels.iter().map(|l| l.correct).sum(),
            total_attempts: self.levels.iter().map(|l| l.attempts).sum(),
            total_matches: self.levels.iter().map(|l| l.matches).sum(),
            accuracy: accuracy.round() as u32,
            user_stopped: self.user_stopped,
            levels: self.levels,
        };
        debug!(?signal, level = self.level, "n-back resolved");
        Some(LevelDecision::Finished(outcome))
    }
}

/// Presentation events emitted by the runner
#[derive(Debug, Clone)]
pub enum NBackEvent {
    Stimulus { level: usize, index: usize, value: u8 },
    Blank,
    /// Chime + pause before the next level starts
    LevelChime { next: usize },
    Finished(NBackOutcome),
}

/// Drive an n-back run on the fixed presentation cadence.
///
/// The runner owns all timers; dropping its future releases them, and since
/// nothing is persisted here, an abandoned run leaves no partial record. A
/// manual stop through the shared handle resolves the machine; the runner
/// notices the terminal phase at its next step and exits.
pub async fn run<R>(
    test: Arc<Mutex<NBackTest>>,
    mut rng: R,
    events: mpsc::Sender<NBackEvent>,
) where
    R: Rng + Send,
{
    loop {
        {
            let t = test.lock().await;
            match t.phase() {
                Phase::Presenting(i) => {
                    let value = t.sequence[i];
                    let level = t.level();
                    drop(t);
                    let _ = events.send(NBackEvent::Stimulus { level, index: i, value }).await;
                }
                Phase::Resolved => return,
                // A stop between steps leaves Evaluating; fall through
                Phase::Evaluating | Phase::Blanked(_) => {}
            }
        }

        sleep(DIGIT_VISIBLE).await;
        {
            let mut t = test.lock().await;
            if t.phase().is_terminal() {
                return;
            }
            t.begin_blank();
        }
        let _ = events.send(NBackEvent::Blank).await;

        sleep(DIGIT_BLANK).await;
        let phase = {
            let mut t = test.lock().await;
            if t.phase().is_terminal() {
                return;
            }
            t.end_blank()
        };

        if phase == Phase::Evaluating {
            sleep(EVALUATE_SETTLE).await;
            let decision = test.lock().await.evaluate(&mut rng);
            match decision {
                Some(LevelDecision::Advance(next)) => {
                    let _ = events.send(NBackEvent::LevelChime { next }).await;
                    sleep(LEVEL_TRANSITION).await;
                }
                Some(LevelDecision::Finished(outcome)) => {
                    let _ = events.send(NBackEvent::Finished(outcome)).await;
                    return;
                }
                // Someone else (a racing stop) already resolved the run
                None => return,
            }
        }
    }
}
