//! # Vigil Game Engine
//!
//! Client-side runtime for the Vigil screening and therapy games:
//! - Trial generation (n-back sequences, shape trials, staircase stimuli,
//!   card decks, reaction probes)
//! - Session scheduling (presentation/blank cadence, completion latches)
//! - Scoring and leveling engines, one per disease module
//! - Session recording against the vigil-server API
//!
//! All scoring machines are pure state; async runners drive them on
//! wall-clock timers. Nothing is persisted until a run reaches an explicit
//! terminal state, so abandoning a run (dropping its runner future) simply
//! releases the timers.

pub mod acuity;
pub mod grid;
pub mod nback;
pub mod recorder;
pub mod schedule;
pub mod tap;
pub mod trial;

pub use recorder::SessionRecorder;
pub use schedule::CompletionLatch;
