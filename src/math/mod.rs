//! Mathematical utilities: the Krüger transverse Mercator series, the stacked
//! scale/offset least squares, and a golden-section line search.

pub mod golden;
pub mod kruger;
pub mod ols;

pub use golden::*;
pub use kruger::*;
pub use ols::*;
