//! `tm-calibrate` library crate.
//!
//! The binary (`tmcal`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the projector oracle and the search are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod projection;
pub mod report;
