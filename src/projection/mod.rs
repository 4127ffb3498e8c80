//! Forward projectors: geodetic → local engine coordinates.
//!
//! The search treats projection as an oracle behind [`ForwardProjector`], so the
//! closed-form implementation and the PROJ command adapter are interchangeable.
//! Both take a whole batch of points per call; the external adapter spawns one
//! process per batch rather than one per point.

use crate::domain::{
    AxisOrder, CalibrationConfig, Ellipsoid, GeodeticCoordinate, LocalCoordinate, ProjectionParameters,
    ProjectorKind,
};
use crate::error::{AppError, ProjectionError};

pub mod proj_cmd;
pub mod tmerc;

pub use proj_cmd::{ProjCommand, proj_definition};
pub use tmerc::TransverseMercator;

/// A pure mapping from geodetic to local coordinates under candidate parameters.
pub trait ForwardProjector: Sync {
    /// Short label for reports and logs.
    fn name(&self) -> &'static str;

    /// How this projector orients (easting, northing) onto (X, Z).
    fn axes(&self) -> AxisOrder;

    /// Project every point, or fail as a whole.
    fn project_batch(
        &self,
        params: &ProjectionParameters,
        points: &[GeodeticCoordinate],
    ) -> Result<Vec<LocalCoordinate>, ProjectionError>;

    fn project(
        &self,
        params: &ProjectionParameters,
        point: &GeodeticCoordinate,
    ) -> Result<LocalCoordinate, ProjectionError> {
        let mut out = self.project_batch(params, std::slice::from_ref(point))?;
        out.pop()
            .ok_or_else(|| ProjectionError::MalformedOutput("empty result for a single point".to_string()))
    }
}

/// Shared parameter validation for all projectors.
pub(crate) fn check_parameters(params: &ProjectionParameters) -> Result<(), ProjectionError> {
    if !params.is_finite() {
        return Err(ProjectionError::InvalidParameters(format!(
            "non-finite parameter in {:?}",
            params.to_array()
        )));
    }
    if params.scale_factor <= 0.0 {
        return Err(ProjectionError::InvalidParameters(format!(
            "scale factor must be > 0 (got {})",
            params.scale_factor
        )));
    }
    Ok(())
}

/// Build the projector selected by a run configuration.
pub fn build_projector(
    kind: ProjectorKind,
    ellipsoid: Ellipsoid,
    axes: AxisOrder,
) -> Result<Box<dyn ForwardProjector>, AppError> {
    match kind {
        ProjectorKind::Tmerc => Ok(Box::new(TransverseMercator::new(ellipsoid, axes))),
        ProjectorKind::Proj => Ok(Box::new(ProjCommand::from_env(ellipsoid, axes)?)),
    }
}

pub fn projector_for_config(config: &CalibrationConfig) -> Result<Box<dyn ForwardProjector>, AppError> {
    build_projector(config.projector, config.ellipsoid, config.axes)
}
