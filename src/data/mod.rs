//! Data sources besides the input CSV.
//!
//! Currently: synthetic correspondence records for round-trip checks.

pub mod synthetic;

pub use synthetic::*;
