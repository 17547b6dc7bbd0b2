//! Memory therapy: escalating pair-matching grid
//!
//! The grid starts small and grows one side length on every full clear, up
//! to a ceiling. Mismatches accumulate across the whole escalating run. A
//! stop only becomes a recordable session after the minimum play time; an
//! earlier stop surfaces a retry prompt and persists nothing. Completion
//! does not clear the memory flag (only the vision staircase clears its
//! flag).

use std::time::{Duration, Instant};

use rand::Rng;

use vigil_common::api::RecordSessionRequest;
use vigil_common::types::{DementiaMetrics, SessionMetrics, THERAPY_COMPLETED};
use vigil_common::{Disease, SessionMode};

use crate::schedule::{CompletionLatch, GRID_MIN_PLAY};
use crate::trial::card_deck;

/// Smallest and largest grid side lengths
pub const GRID_FLOOR: usize = 2;
pub const GRID_CEILING: usize = 8;

/// Result of flipping one card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipResult {
    /// Card already matched, already face up, or the run is over
    Ignored,
    /// First card of a pair turned face up
    First,
    /// Second card matched the first
    Matched,
    /// Whole grid cleared; the board escalated to the given side length
    GridCleared { new_size: usize },
    /// Second card did not match; both flip back
    Mismatch,
}

/// Terminal summary of a completed (recordable) grid run
#[derive(Debug, Clone, PartialEq)]
pub struct GridOutcome {
    pub grid_size: usize,
    /// Pairs matched on the current board at stop time
    pub matched_pairs: u32,
    /// Mismatched flips across the whole escalating run
    pub mistakes: u32,
    /// Elapsed seconds, two decimals
    pub time: f64,
}

impl GridOutcome {
    pub fn to_record(&self) -> RecordSessionRequest {
        RecordSessionRequest {
            disease_type: Disease::Dementia,
            mode: SessionMode::Therapy,
            result: THERAPY_COMPLETED.to_string(),
            metrics: SessionMetrics::dementia(DementiaMetrics {
                grid_size: Some(self.grid_size as u32),
                correct_answers: Some(self.matched_pairs),
                mistakes: Some(self.mistakes),
                time: Some(self.time),
                ..Default::default()
            }),
        }
    }
}

/// How a stop request resolved
#[derive(Debug, Clone, PartialEq)]
pub enum GridStop {
    /// Below the minimum play time: nothing recorded, offer to resume
    TooEarly { elapsed: Duration },
    /// Recordable session
    Completed(GridOutcome),
}

/// The escalating pair-matching board
#[derive(Debug)]
pub struct GridTherapy {
    grid_size: usize,
    deck: Vec<u32>,
    matched: Vec<bool>,
    face_up: Option<usize>,
    mistakes: u32,
    started: Instant,
    latch: CompletionLatch,
}

impl GridTherapy {
    pub fn new(rng: &mut impl Rng) -> Self {
        let deck = card_deck(GRID_FLOOR, rng);
        let cards = deck.len();
        Self {
            grid_size: GRID_FLOOR,
            deck,
            matched: vec![false; cards],
            face_up: None,
            mistakes: 0,
            started: Instant::now(),
            latch: CompletionLatch::new(),
        }
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn matched_pairs(&self) -> u32 {
        (self.matched.iter().filter(|m| **m).count() / 2) as u32
    }

    pub fn deck(&self) -> &[u32] {
        &self.deck
    }

    /// Flip the card at `index`. Matching the last pair escalates the board
    /// (fresh shuffled deck, side + 1) until the ceiling is reached.
    pub fn flip(&mut self, index: usize, rng: &mut impl Rng) -> FlipResult {
        if self.latch.is_complete() || index >= self.deck.len() || self.matched[index] {
            return FlipResult::Ignored;
        }
        match self.face_up {
            None => {
                self.face_up = Some(index);
                FlipResult::First
            }
            Some(first) if first == index => FlipResult::Ignored,
            Some(first) => {
                self.face_up = None;
                if self.deck[first] == self.deck[index] {
                    self.matched[first] = true;
                    self.matched[index] = true;
                    if self.matched.iter().all(|m| *m) && self.grid_size < GRID_CEILING {
                        self.escalate(rng);
                        FlipResult::GridCleared { new_size: self.grid_size }
                    } else {
                        FlipResult::Matched
                    }
                } else {
                    self.mistakes += 1;
                    FlipResult::Mismatch
                }
            }
        }
    }

    fn escalate(&mut self, rng: &mut impl Rng) {
        self.grid_size += 1;
        self.deck = card_deck(self.grid_size, rng);
        self.matched = vec![false; self.deck.len()];
        self.face_up = None;
    }

    /// Stop using the wall clock
    pub fn stop(&mut self) -> Option<GridStop> {
        self.stop_at(self.started.elapsed())
    }

    /// Stop with an explicit elapsed duration. Below the minimum play time
    /// the run stays live (retryable); otherwise the run resolves exactly
    /// once.
    pub fn stop_at(&mut self, elapsed: Duration) -> Option<GridStop> {
        if self.latch.is_complete() {
            return None;
        }
        if elapsed < GRID_MIN_PLAY {
            return Some(GridStop::TooEarly { elapsed });
        }
        if !self.latch.try_complete() {
            return None;
        }
        let time = (elapsed.as_secs_f64() * 100.0).round() / 100.0;
        Some(GridStop::Completed(GridOutcome {
            grid_size: self.grid_size,
            matched_pairs: self.matched_pairs(),
            mistakes: self.mistakes,
            time,
        }))
    }

    /// Resume after a too-early stop: reshuffle the current board, keeping
    /// the run-wide mistake tally
    pub fn retry(&mut self, rng: &mut impl Rng) {
        if self.latch.is_complete() {
            return;
        }
        self.deck = card_deck(self.grid_size, rng);
        self.matched = vec![false; self.deck.len()];
        self.face_up = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(55)
    }

    /// Clear the current board by pairing identical values
    fn clear_board(grid: &mut GridTherapy, rng: &mut StdRng) -> FlipResult {
        let mut last = FlipResult::Ignored;
        loop {
            let deck: Vec<u32> = grid.deck().to_vec();
            let next_unmatched = (0..deck.len()).find(|&i| !grid.matched[i]);
            let Some(first) = next_unmatched else { return last };
            let partner = (0..deck.len())
                .find(|&i| i != first && deck[i] == deck[first] && !grid.matched[i])
                .expect("every value appears twice");
            assert_eq!(grid.flip(first, rng), FlipResult::First);
            last = grid.flip(partner, rng);
            if matches!(last, FlipResult::GridCleared { .. }) {
                return last;
            }
        }
    }

    #[test]
    fn matching_all_pairs_escalates_until_ceiling() {
        let mut r = rng();
        let mut grid = GridTherapy::new(&mut r);
        assert_eq!(grid.grid_size(), 2);

        let result = clear_board(&mut grid, &mut r);
        assert_eq!(result, FlipResult::GridCleared { new_size: 3 });
        assert_eq!(grid.grid_size(), 3);
        assert_eq!(grid.matched_pairs(), 0);
    }

    #[test]
    fn mismatches_accumulate_across_boards() {
        let mut r = rng();
        let mut grid = GridTherapy::new(&mut r);

        // 2x2 deck is two pairs; find a guaranteed mismatch
        let deck: Vec<u32> = grid.deck().to_vec();
        let other = (1..deck.len()).find(|&i| deck[i] != deck[0]).unwrap();
        assert_eq!(grid.flip(0, &mut r), FlipResult::First);
        assert_eq!(grid.flip(other, &mut r), FlipResult::Mismatch);
        assert_eq!(grid.mistakes(), 1);

        clear_board(&mut grid, &mut r);
        assert_eq!(grid.grid_size(), 3);
        assert_eq!(grid.mistakes(), 1);
    }

    #[test]
    fn double_flip_of_same_card_is_ignored() {
        let mut r = rng();
        let mut grid = GridTherapy::new(&mut r);
        assert_eq!(grid.flip(1, &mut r), FlipResult::First);
        assert_eq!(grid.flip(1, &mut r), FlipResult::Ignored);
        assert_eq!(grid.flip(99, &mut r), FlipResult::Ignored);
    }

    #[test]
    fn early_stop_is_not_recordable_and_allows_retry() {
        let mut r = rng();
        let mut grid = GridTherapy::new(&mut r);

        let stop = grid.stop_at(Duration::from_secs(4));
        assert!(matches!(stop, Some(GridStop::TooEarly { .. })));

        // The run stays live: flips and a later stop still work
        grid.retry(&mut r);
        assert_eq!(grid.flip(0, &mut r), FlipResult::First);

        let stop = grid.stop_at(Duration::from_secs(12));
        match stop {
            Some(GridStop::Completed(outcome)) => {
                assert_eq!(outcome.grid_size, 2);
                assert_eq!(outcome.mistakes, 0);
                assert_eq!(outcome.time, 12.0);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn stop_past_gate_resolves_exactly_once() {
        let mut r = rng();
        let mut grid = GridTherapy::new(&mut r);
        clear_board(&mut grid, &mut r);

        let first = grid.stop_at(Duration::from_secs(30));
        assert!(matches!(first, Some(GridStop::Completed(_))));
        assert!(grid.stop_at(Duration::from_secs(31)).is_none());
        assert_eq!(grid.flip(0, &mut r), FlipResult::Ignored);
    }

    #[test]
    fn completed_outcome_record_shape() {
        let mut r = rng();
        let mut grid = GridTherapy::new(&mut r);
        clear_board(&mut grid, &mut r); // now on 3x3

        let deck: Vec<u32> = grid.deck().to_vec();
        let partner = (1..deck.len()).find(|&i| deck[i] == deck[0]).unwrap();
        grid.flip(0, &mut r);
        grid.flip(partner, &mut r);

        let outcome = match grid.stop_at(Duration::from_millis(15_500)) {
            Some(GridStop::Completed(o)) => o,
            other => panic!("expected Completed, got {other:?}"),
        };
        assert_eq!(outcome.grid_size, 3);
        assert_eq!(outcome.matched_pairs, 1);
        assert_eq!(outcome.time, 15.5);

        let record = outcome.to_record();
        assert_eq!(record.disease_type, Disease::Dementia);
        assert_eq!(record.mode, SessionMode::Therapy);
        assert_eq!(record.result, THERAPY_COMPLETED);
        let m = record.metrics.dementia.expect("dementia metrics");
        assert_eq!(m.grid_size, Some(3));
        assert_eq!(m.correct_answers, Some(1));
        assert_eq!(m.mistakes, Some(0));
    }
}
