//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - coordinates and correspondence records (`GeodeticCoordinate`, `LocalCoordinate`,
//!   `CorrespondenceRecord`)
//! - the unknowns and their search ranges (`ProjectionParameters`, `ParameterBounds`)
//! - run configuration (`CalibrationConfig`, `SearchConfig`)
//! - fit outputs (`RecordResidual`, `ResidualSummary`, `FitFile`)

pub mod types;

pub use types::*;
