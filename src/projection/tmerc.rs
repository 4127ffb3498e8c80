//! Closed-form ellipsoidal transverse Mercator projector.

use crate::domain::{AxisOrder, Ellipsoid, GeodeticCoordinate, LocalCoordinate, ProjectionParameters};
use crate::error::ProjectionError;
use crate::math::KrugerSeries;
use crate::projection::{ForwardProjector, check_parameters};

/// In-process transverse Mercator with `lat_0 = 0`.
#[derive(Debug, Clone, Copy)]
pub struct TransverseMercator {
    series: KrugerSeries,
    ellipsoid: Ellipsoid,
    axes: AxisOrder,
}

impl TransverseMercator {
    pub fn new(ellipsoid: Ellipsoid, axes: AxisOrder) -> Self {
        Self {
            series: KrugerSeries::new(ellipsoid),
            ellipsoid,
            axes,
        }
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        self.ellipsoid
    }

    fn project_one(
        &self,
        params: &ProjectionParameters,
        point: &GeodeticCoordinate,
    ) -> Result<LocalCoordinate, ProjectionError> {
        let (e, n) = self
            .series
            .forward(point.latitude, point.longitude - params.central_longitude)
            .ok_or(ProjectionError::Unprojectable {
                latitude: point.latitude,
                longitude: point.longitude,
            })?;
        let easting = params.false_easting + params.scale_factor * e;
        let northing = params.false_northing + params.scale_factor * n;
        Ok(self.axes.to_local(easting, northing))
    }
}

impl Default for TransverseMercator {
    fn default() -> Self {
        Self::new(Ellipsoid::Wgs84, AxisOrder::NorthingEasting)
    }
}

impl ForwardProjector for TransverseMercator {
    fn name(&self) -> &'static str {
        "tmerc"
    }

    fn axes(&self) -> AxisOrder {
        self.axes
    }

    fn project_batch(
        &self,
        params: &ProjectionParameters,
        points: &[GeodeticCoordinate],
    ) -> Result<Vec<LocalCoordinate>, ProjectionError> {
        check_parameters(params)?;
        points.iter().map(|p| self.project_one(params, p)).collect()
    }
}
