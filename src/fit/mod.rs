//! Parameter estimation.
//!
//! Responsibilities:
//!
//! - price candidate parameters (`cost`)
//! - seed λ₀ by profile least squares (`grid`, `profile`)
//! - bounded global search (`anneal`, `simplex`, `search`)
//! - leave-one-out validation (`crossval`)
//! - inverse projection by search (`locate`)

pub mod anneal;
pub mod cost;
pub mod crossval;
pub mod grid;
pub mod locate;
pub mod profile;
pub mod search;
pub mod simplex;

pub use cost::*;
pub use crossval::*;
pub use locate::*;
pub use search::*;
