//! Vision screening: shape-matching detection and the perceptual staircase
//! therapy
//!
//! Detection shows a fixed number of shape trials and classifies by correct
//! count. Therapy runs an adaptive staircase over a size difference,
//! converging toward a perceptual threshold; unlike the other therapy
//! modules it explicitly clears its disease flag on completion.

use rand::Rng;

use vigil_common::api::{FlagUpdateRequest, RecordSessionRequest};
use vigil_common::types::{SessionMetrics, VisionMetrics, THERAPY_COMPLETED};
use vigil_common::{Disease, SessionMode, Signal};

use crate::schedule::CompletionLatch;
use crate::trial::{shape_trials, staircase_stimulus, Shape, ShapeTrial, Side, StaircaseStimulus};

/// Shape trials per detection run
pub const DETECTION_TRIALS: usize = 10;

/// Correct answers at or above this are Green
pub const GREEN_CORRECT: u32 = 8;

/// Correct answers at or above this (and below Green) are Yellow
pub const YELLOW_CORRECT: u32 = 6;

/// Staircase trial count
pub const STAIRCASE_TRIALS: u32 = 12;

/// Initial size difference
pub const STAIRCASE_START: i32 = 18;

/// Per-trial step
pub const STAIRCASE_STEP: i32 = 2;

/// Difference bounds; the staircase never leaves [floor, ceiling]
pub const STAIRCASE_FLOOR: i32 = 2;
pub const STAIRCASE_CEILING: i32 = 26;

/// Classify a finished shape run by correct count
pub fn classify_correct(correct: u32) -> Signal {
    if correct >= GREEN_CORRECT {
        Signal::Green
    } else if correct >= YELLOW_CORRECT {
        Signal::Yellow
    } else {
        Signal::Red
    }
}

/// Terminal summary of a shape detection run
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeOutcome {
    pub correct: u32,
    pub trials: u32,
    pub signal: Signal,
    /// Whole seconds from first trial to last answer
    pub elapsed_secs: u64,
}

impl ShapeOutcome {
    pub fn to_record(&self) -> RecordSessionRequest {
        RecordSessionRequest {
            disease_type: Disease::Vision,
            mode: SessionMode::Detection,
            result: self.signal.to_string(),
            metrics: SessionMetrics::vision(VisionMetrics {
                correct_answers: Some(self.correct),
                time: Some(self.elapsed_secs as f64),
                ..Default::default()
            }),
        }
    }

    pub fn flag_update(&self) -> Option<FlagUpdateRequest> {
        if self.signal.needs_therapy() {
            Some(FlagUpdateRequest::for_disease(Disease::Vision, true))
        } else {
            None
        }
    }
}

/// The fixed-length shape-matching test
#[derive(Debug)]
pub struct ShapeTest {
    trials: Vec<ShapeTrial>,
    index: usize,
    correct: u32,
    latch: CompletionLatch,
}

impl ShapeTest {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self::with_trials(shape_trials(DETECTION_TRIALS, rng))
    }

    /// Fixed trial set for deterministic harnesses
    pub fn with_trials(trials: Vec<ShapeTrial>) -> Self {
        assert!(!trials.is_empty());
        Self { trials, index: 0, correct: 0, latch: CompletionLatch::new() }
    }

    pub fn current_trial(&self) -> Option<&ShapeTrial> {
        self.trials.get(self.index)
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.trials.len()
    }

    /// Answer the current trial; returns whether the pick was correct, or
    /// None once the run is over
    pub fn choose(&mut self, picked: Shape) -> Option<bool> {
        let trial = self.trials.get(self.index)?;
        let correct = picked == trial.correct;
        if correct {
            self.correct += 1;
        }
        self.index += 1;
        Some(correct)
    }

    /// Close the run. Returns the outcome exactly once.
    pub fn finish(&mut self, elapsed_secs: u64) -> Option<ShapeOutcome> {
        if !self.is_complete() || !self.latch.try_complete() {
            return None;
        }
        Some(ShapeOutcome {
            correct: self.correct,
            trials: self.trials.len() as u32,
            signal: classify_correct(self.correct),
            elapsed_secs,
        })
    }
}

/// Terminal summary of a staircase therapy run
#[derive(Debug, Clone, PartialEq)]
pub struct StaircaseOutcome {
    pub final_threshold: i32,
    pub correct: u32,
    pub attempts: u32,
}

impl StaircaseOutcome {
    pub fn to_record(&self) -> RecordSessionRequest {
        RecordSessionRequest {
            disease_type: Disease::Vision,
            mode: SessionMode::Therapy,
            result: THERAPY_COMPLETED.to_string(),
            metrics: SessionMetrics::vision(VisionMetrics {
                correct_answers: Some(self.correct),
                attempts: Some(self.attempts),
                time: None,
                final_threshold: Some(self.final_threshold),
            }),
        }
    }

    /// Completing the staircase always clears the vision flag. The motor and
    /// memory therapy modules deliberately do not have an equivalent.
    pub fn flag_update(&self) -> FlagUpdateRequest {
        FlagUpdateRequest::for_disease(Disease::Vision, false)
    }
}

/// Adaptive staircase: correct answers shrink the difference, wrong ones grow
/// it, clamped to the fixed bounds
#[derive(Debug)]
pub struct Staircase {
    difference: i32,
    responses: u32,
    correct: u32,
    latch: CompletionLatch,
}

impl Default for Staircase {
    fn default() -> Self {
        Self::new()
    }
}

impl Staircase {
    pub fn new() -> Self {
        Self {
            difference: STAIRCASE_START,
            responses: 0,
            correct: 0,
            latch: CompletionLatch::new(),
        }
    }

    pub fn difference(&self) -> i32 {
        self.difference
    }

    pub fn trial(&self) -> u32 {
        self.responses + 1
    }

    pub fn is_complete(&self) -> bool {
        self.responses >= STAIRCASE_TRIALS
    }

    /// Generate the next two-stimulus comparison at the current difference
    pub fn next_stimulus(&self, rng: &mut impl Rng) -> StaircaseStimulus {
        staircase_stimulus(self.difference, rng)
    }

    /// Score a side choice against the stimulus ground truth and adapt
    pub fn respond(&mut self, stimulus: &StaircaseStimulus, chosen: Side) -> bool {
        let correct = chosen == stimulus.larger;
        self.record(correct);
        correct
    }

    /// Adapt the difference for one response
    pub fn record(&mut self, correct: bool) {
        if self.is_complete() {
            return;
        }
        if correct {
            self.correct += 1;
            self.difference = (self.difference - STAIRCASE_STEP).max(STAIRCASE_FLOOR);
        } else {
            self.difference = (self.difference + STAIRCASE_STEP).min(STAIRCASE_CEILING);
        }
        self.responses += 1;
    }

    /// Close the run. Returns the outcome exactly once.
    pub fn finish(&mut self) -> Option<StaircaseOutcome> {
        if !self.is_complete() || !self.latch.try_complete() {
            return None;
        }
        Some(StaircaseOutcome {
            final_threshold: self.difference,
            correct: self.correct,
            attempts: STAIRCASE_TRIALS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn correct_count_classification_boundaries() {
        assert_eq!(classify_correct(10), Signal::Green);
        assert_eq!(classify_correct(8), Signal::Green);
        assert_eq!(classify_correct(7), Signal::Yellow);
        assert_eq!(classify_correct(6), Signal::Yellow);
        assert_eq!(classify_correct(5), Signal::Red);
        assert_eq!(classify_correct(0), Signal::Red);
    }

    #[test]
    fn shape_test_scores_picks_and_finishes_once() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut test = ShapeTest::new(&mut rng);

        for _ in 0..DETECTION_TRIALS {
            let correct_shape = test.current_trial().unwrap().correct;
            assert_eq!(test.choose(correct_shape), Some(true));
        }
        assert!(test.is_complete());
        assert_eq!(test.choose(Shape::Circle), None);

        let outcome = test.finish(23).expect("complete run yields outcome");
        assert_eq!(outcome.correct, 10);
        assert_eq!(outcome.signal, Signal::Green);
        assert_eq!(outcome.elapsed_secs, 23);
        assert!(test.finish(23).is_none());
    }

    #[test]
    fn shape_test_cannot_finish_early() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut test = ShapeTest::new(&mut rng);
        test.choose(test.current_trial().unwrap().correct);
        assert!(test.finish(3).is_none());
    }

    #[test]
    fn yellow_shape_run_flags_vision() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut test = ShapeTest::new(&mut rng);
        // 6 right, 4 deliberately wrong
        for i in 0..DETECTION_TRIALS {
            let trial = test.current_trial().unwrap();
            let pick = if i < 6 {
                trial.correct
            } else {
                *trial.options.iter().find(|s| **s != trial.correct).unwrap()
            };
            test.choose(pick);
        }
        let outcome = test.finish(40).unwrap();
        assert_eq!(outcome.signal, Signal::Yellow);
        let flags = outcome.flag_update().expect("yellow flags d3");
        assert_eq!(flags.d3, Some(true));
    }

    #[test]
    fn staircase_difference_stays_within_bounds() {
        // All-correct run drives the difference to the floor
        let mut stair = Staircase::new();
        for _ in 0..STAIRCASE_TRIALS {
            stair.record(true);
        }
        assert_eq!(stair.difference(), STAIRCASE_FLOOR);

        // All-wrong run saturates at the ceiling
        let mut stair = Staircase::new();
        for _ in 0..STAIRCASE_TRIALS {
            stair.record(false);
        }
        assert_eq!(stair.difference(), STAIRCASE_CEILING);

        // Random response patterns never escape the bounds
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..200 {
            let mut stair = Staircase::new();
            while !stair.is_complete() {
                stair.record(rng.gen_bool(0.5));
                assert!((STAIRCASE_FLOOR..=STAIRCASE_CEILING).contains(&stair.difference()));
            }
        }
    }

    #[test]
    fn staircase_scores_against_stimulus_ground_truth() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut stair = Staircase::new();
        let stimulus = stair.next_stimulus(&mut rng);
        let before = stair.difference();
        assert!(stair.respond(&stimulus, stimulus.larger));
        assert_eq!(stair.difference(), before - STAIRCASE_STEP);
    }

    #[test]
    fn staircase_outcome_clears_vision_flag() {
        let mut stair = Staircase::new();
        for i in 0..STAIRCASE_TRIALS {
            stair.record(i % 2 == 0);
        }
        let outcome = stair.finish().expect("complete run yields outcome");
        assert_eq!(outcome.attempts, 12);
        assert_eq!(outcome.correct, 6);
        assert!(stair.finish().is_none());

        let flags = outcome.flag_update();
        assert_eq!(flags.d3, Some(false));
        assert!(flags.d1.is_none() && flags.d2.is_none());

        let record = outcome.to_record();
        assert_eq!(record.result, THERAPY_COMPLETED);
        let m = record.metrics.vision.expect("vision metrics");
        assert_eq!(m.final_threshold, Some(outcome.final_threshold));
    }
}
