//! Motor screening (Parkinson's): tap-count detection and reaction-probe
//! therapy
//!
//! Detection is a single fixed 15-second window classified by raw tap count.
//! Therapy is a fixed series of reaction probes reporting aggregate reaction
//! time; it produces a completion record, not a classification, and it does
//! not clear the motor flag (only detection mutates d1).

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, sleep};

use vigil_common::api::{FlagUpdateRequest, RecordSessionRequest};
use vigil_common::types::{ParkinsonMetrics, SessionMetrics, THERAPY_COMPLETED};
use vigil_common::{Disease, SessionMode, Signal};

use crate::schedule::{CompletionLatch, PROBE_DELAY, TAP_WINDOW};
use crate::trial::{probe_placement, ProbePlacement};

/// Tap counts at or above this are Green
pub const GREEN_TAPS: u32 = 35;

/// Tap counts at or above this (and below Green) are Yellow
pub const YELLOW_TAPS: u32 = 27;

/// Reaction probes per therapy run
pub const THERAPY_PROBES: usize = 15;

/// Classify a finished tap window by raw count
pub fn classify_taps(taps: u32) -> Signal {
    if taps >= GREEN_TAPS {
        Signal::Green
    } else if taps >= YELLOW_TAPS {
        Signal::Yellow
    } else {
        Signal::Red
    }
}

/// Terminal summary of a tap detection run
#[derive(Debug, Clone, PartialEq)]
pub struct TapOutcome {
    pub taps: u32,
    pub signal: Signal,
}

impl TapOutcome {
    pub fn to_record(&self) -> RecordSessionRequest {
        let window_secs = TAP_WINDOW.as_secs_f64();
        RecordSessionRequest {
            disease_type: Disease::Parkinson,
            mode: SessionMode::Detection,
            result: self.signal.to_string(),
            metrics: SessionMetrics::parkinson(ParkinsonMetrics {
                taps_per_second: Some(f64::from(self.taps) / window_secs),
                correct_taps: Some(self.taps),
                time: Some(window_secs),
            }),
        }
    }

    pub fn flag_update(&self) -> Option<FlagUpdateRequest> {
        if self.signal.needs_therapy() {
            Some(FlagUpdateRequest::for_disease(Disease::Parkinson, true))
        } else {
            None
        }
    }
}

/// The 15-second tap-count window
#[derive(Debug)]
pub struct TapTest {
    taps: u32,
    latch: CompletionLatch,
}

impl Default for TapTest {
    fn default() -> Self {
        Self::new()
    }
}

impl TapTest {
    pub fn new() -> Self {
        Self { taps: 0, latch: CompletionLatch::new() }
    }

    pub fn taps(&self) -> u32 {
        self.taps
    }

    /// Count a tap; taps after the window closes are dropped
    pub fn record_tap(&mut self) -> bool {
        if self.latch.is_complete() {
            return false;
        }
        self.taps += 1;
        true
    }

    /// Close the window. Returns the outcome exactly once.
    pub fn finish(&mut self) -> Option<TapOutcome> {
        if !self.latch.try_complete() {
            return None;
        }
        Some(TapOutcome { taps: self.taps, signal: classify_taps(self.taps) })
    }
}

/// Countdown events for the tap test
#[derive(Debug, Clone)]
pub enum TapEvent {
    /// Whole seconds remaining in the window
    Tick { remaining: u64 },
    Finished(TapOutcome),
}

/// Drive the countdown; ticks once per second and closes the window at zero
pub async fn run_tap_test(test: Arc<Mutex<TapTest>>, events: mpsc::Sender<TapEvent>) {
    let total = TAP_WINDOW.as_secs();
    let mut ticker = interval(Duration::from_secs(1));
    // First tick completes immediately
    ticker.tick().await;

    for elapsed in 1..=total {
        ticker.tick().await;
        let _ = events.send(TapEvent::Tick { remaining: total - elapsed }).await;
    }

    if let Some(outcome) = test.lock().await.finish() {
        let _ = events.send(TapEvent::Finished(outcome)).await;
    }
}

/// Terminal summary of a reaction-probe therapy run
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionOutcome {
    pub probes: u32,
    /// Sum of per-probe reaction times, in seconds (two decimals)
    pub total_time: f64,
}

impl ReactionOutcome {
    pub fn to_record(&self) -> RecordSessionRequest {
        RecordSessionRequest {
            disease_type: Disease::Parkinson,
            mode: SessionMode::Therapy,
            result: THERAPY_COMPLETED.to_string(),
            metrics: SessionMetrics::parkinson(ParkinsonMetrics {
                taps_per_second: None,
                correct_taps: Some(self.probes),
                time: Some(self.total_time),
            }),
        }
    }
}

/// Reaction-probe therapy: a fixed count of randomly placed shapes, each
/// timed from appearance to tap
#[derive(Debug, Default)]
pub struct ReactionTherapy {
    reaction_times: Vec<Duration>,
}

impl ReactionTherapy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probes_done(&self) -> usize {
        self.reaction_times.len()
    }

    pub fn is_complete(&self) -> bool {
        self.reaction_times.len() >= THERAPY_PROBES
    }

    /// Record the reaction time for the current probe
    pub fn record_reaction(&mut self, elapsed: Duration) {
        if !self.is_complete() {
            self.reaction_times.push(elapsed);
        }
    }

    pub fn outcome(&self) -> Option<ReactionOutcome> {
        if !self.is_complete() {
            return None;
        }
        let total: Duration = self.reaction_times.iter().sum();
        Some(ReactionOutcome {
            probes: THERAPY_PROBES as u32,
            total_time: (total.as_secs_f64() * 100.0).round() / 100.0,
        })
    }
}

/// Probe presentation events
#[derive(Debug, Clone)]
pub enum ProbeEvent {
    Show(ProbePlacement),
    Finished(ReactionOutcome),
}

/// Present probes one at a time: each tap (reported through `taps`) hides the
/// shape, waits the inter-probe delay, and shows the next placement.
pub async fn run_reaction_therapy<R>(
    therapy: Arc<Mutex<ReactionTherapy>>,
    mut rng: R,
    mut taps: mpsc::Receiver<Duration>,
    events: mpsc::Sender<ProbeEvent>,
) where
    R: Rng + Send,
{
    loop {
        {
            let t = therapy.lock().await;
            if t.is_complete() {
                break;
            }
        }
        let placement = probe_placement(&mut rng);
        let _ = events.send(ProbeEvent::Show(placement)).await;

        // Wait for the tap; a closed channel means the run was abandoned
        let Some(elapsed) = taps.recv().await else { return };
        therapy.lock().await.record_reaction(elapsed);
        sleep(PROBE_DELAY).await;
    }

    if let Some(outcome) = therapy.lock().await.outcome() {
        let _ = events.send(ProbeEvent::Finished(outcome)).await;
    }
}
