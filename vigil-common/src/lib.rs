//! # Vigil Common Library
//!
//! Shared code for the Vigil screening/therapy platform:
//! - Domain types (diseases, session modes, screening signals, metrics)
//! - API request/response types
//! - Common error type
//! - BMI derivation for questionnaires

pub mod api;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Disease, SessionMode, Signal};
