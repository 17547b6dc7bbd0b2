//! Session scheduling primitives
//!
//! Timing constants for stimulus presentation, the per-level phase machine,
//! and the one-shot completion latch that keeps racing exit paths (a manual
//! stop against a scheduled auto-advance) from resolving a session twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long each n-back digit stays visible
pub const DIGIT_VISIBLE: Duration = Duration::from_millis(2500);

/// Inter-stimulus blank between digits; input is rejected while blanked
pub const DIGIT_BLANK: Duration = Duration::from_millis(800);

/// Pause (with chime) between n-back levels
pub const LEVEL_TRANSITION: Duration = Duration::from_millis(3500);

/// Settle delay between sequence exhaustion and evaluation
pub const EVALUATE_SETTLE: Duration = Duration::from_millis(150);

/// Delay before the next reaction probe appears after a tap
pub const PROBE_DELAY: Duration = Duration::from_millis(500);

/// Feedback delay between shape trials
pub const SHAPE_TRIAL_DELAY: Duration = Duration::from_millis(550);

/// Tap-test countdown window
pub const TAP_WINDOW: Duration = Duration::from_secs(15);

/// Minimum play time before a grid-therapy stop is recordable
pub const GRID_MIN_PLAY: Duration = Duration::from_secs(10);

/// Presentation phase of one level.
///
/// `Presenting(i)` shows stimulus i (input enabled once i reaches the n-back
/// offset); `Blanked(i)` is the inter-stimulus interval with input disabled;
/// `Evaluating` means the sequence is exhausted or the user stopped;
/// `Resolved` is terminal for the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Presenting(usize),
    Blanked(usize),
    Evaluating,
    Resolved,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Resolved)
    }

    /// Index of the stimulus currently on screen, if any
    pub fn stimulus_index(&self) -> Option<usize> {
        match self {
            Phase::Presenting(i) => Some(*i),
            _ => None,
        }
    }
}

/// One-shot completion latch.
///
/// Handlers on the single-threaded run loop can still interleave with timer
/// callbacks; whichever path wins the latch performs the terminal work, the
/// loser becomes a no-op.
#[derive(Debug, Clone, Default)]
pub struct CompletionLatch {
    fired: Arc<AtomicBool>,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once, for the first caller
    pub fn try_complete(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
