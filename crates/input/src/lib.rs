//! Input: raw keys mapped to a small action set.
//!
//! # Invariants
//! - Sessions consume [`Action`]s, never raw keys.
//! - Mapping is total; unrecognized keys become [`Action::Unknown`].

pub mod action;

pub use action::{Action, Direction};
