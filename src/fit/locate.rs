//! Inverse projection by search: which lat/lon lands on a given local point?
//!
//! The forward projector is the only oracle, so the inverse is found with a
//! Nelder–Mead search over a latitude/longitude box centred on the central
//! meridian, started from a spherical estimate.

use crate::domain::{GeodeticCoordinate, LocalCoordinate, ParameterRange, ProjectionParameters, RangeKind};
use crate::error::AppError;
use crate::fit::simplex::{SimplexOptions, nelder_mead};
use crate::math::wrap_degrees;
use crate::projection::ForwardProjector;

/// Half-width of the search box in degrees (latitude and distance from λ₀).
const SEARCH_SPAN_DEG: f64 = 85.0;

/// WGS84 rectifying radius; close enough for a starting estimate on any ellipsoid.
const MEAN_RADIUS_M: f64 = 6_367_449.146;

/// Number of Nelder–Mead runs, each restarted from the previous best.
const ROUNDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocateResult {
    pub geodetic: GeodeticCoordinate,
    /// Where `geodetic` actually projects.
    pub projected: LocalCoordinate,
    /// Distance between `projected` and the target (meters).
    pub distance: f64,
    pub evaluations: usize,
}

/// Find the geodetic coordinate projecting onto `target`.
pub fn locate(
    projector: &dyn ForwardProjector,
    params: &ProjectionParameters,
    target: &LocalCoordinate,
) -> Result<LocateResult, AppError> {
    if !params.is_finite() || params.scale_factor <= 0.0 {
        return Err(AppError::new(2, "Cannot locate with invalid projection parameters."));
    }
    if !(target.x.is_finite() && target.z.is_finite()) {
        return Err(AppError::new(2, "Target coordinate must be finite."));
    }

    let lat_range = ParameterRange::new(-SEARCH_SPAN_DEG, SEARCH_SPAN_DEG, RangeKind::Physical);
    let lon_range = ParameterRange::new(
        params.central_longitude - SEARCH_SPAN_DEG,
        params.central_longitude + SEARCH_SPAN_DEG,
        RangeKind::Physical,
    );
    let to_geodetic = |u: &[f64]| {
        let lat = lat_range.clamp(lat_range.min + u[0].clamp(0.0, 1.0) * lat_range.span());
        let lon = lon_range.clamp(lon_range.min + u[1].clamp(0.0, 1.0) * lon_range.span());
        GeodeticCoordinate::new(lat, wrap_degrees(lon)).ok()
    };
    let objective = |u: &[f64]| {
        to_geodetic(u)
            .and_then(|g| projector.project(params, &g).ok())
            .map_or(f64::INFINITY, |p| p.squared_distance(target))
    };

    // Spherical first guess from the offsets.
    let (easting, northing) = projector.axes().to_easting_northing(target);
    let lat0 = lat_range.clamp(((northing - params.false_northing) / (params.scale_factor * MEAN_RADIUS_M)).to_degrees());
    let lon0 = lon_range.clamp(
        params.central_longitude
            + ((easting - params.false_easting) / (params.scale_factor * MEAN_RADIUS_M * lat0.to_radians().cos()))
                .to_degrees(),
    );
    let mut u = vec![
        (lat0 - lat_range.min) / lat_range.span(),
        (lon0 - lon_range.min) / lon_range.span(),
    ];

    let opts = SimplexOptions {
        initial_step: 0.01,
        max_evals: 2000,
        ftol: 1e-14,
        xtol: 1e-13,
    };
    let mut evaluations = 0;
    for _ in 0..ROUNDS {
        let r = nelder_mead(objective, &u, &opts);
        evaluations += r.evaluations;
        u = r.x;
    }

    let geodetic = to_geodetic(&u).ok_or_else(|| AppError::new(4, "Inverse search left the valid coordinate range."))?;
    let projected = projector.project(params, &geodetic)?;
    let distance = projected.squared_distance(target).sqrt();
    log::debug!(
        "located ({}, {}) at {:.8}, {:.8} within {:.3e} m after {} evaluations",
        target.x,
        target.z,
        geodetic.latitude,
        geodetic.longitude,
        distance,
        evaluations
    );
    Ok(LocateResult {
        geodetic,
        projected,
        distance,
        evaluations,
    })
}
