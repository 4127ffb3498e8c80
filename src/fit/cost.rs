//! Residual cost: sum of squared distances between predicted and known local
//! coordinates.
//!
//! The cost is total over the search domain. Any projection failure is priced
//! as `+∞` so derivative-free optimizers can route around invalid regions by
//! comparing scalars.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{CorrespondenceRecord, GeodeticCoordinate, LocalCoordinate, ProjectionParameters};
use crate::error::ProjectionError;
use crate::projection::ForwardProjector;

/// Sum of squared residuals, or the projection failure that prevented it.
pub fn try_cost(
    projector: &dyn ForwardProjector,
    params: &ProjectionParameters,
    records: &[CorrespondenceRecord],
) -> Result<f64, ProjectionError> {
    if records.is_empty() {
        return Ok(0.0);
    }
    let points: Vec<GeodeticCoordinate> = records.iter().map(|r| r.geodetic).collect();
    let predicted = projector.project_batch(params, &points)?;
    Ok(sum_squared(records.iter().map(|r| &r.local), &predicted))
}

/// Sum of squared residuals; `+∞` if the projector fails for any record.
///
/// Returns `0.0` for an empty record set.
pub fn cost(projector: &dyn ForwardProjector, params: &ProjectionParameters, records: &[CorrespondenceRecord]) -> f64 {
    match try_cost(projector, params, records) {
        Ok(v) if !v.is_nan() => v,
        _ => f64::INFINITY,
    }
}

fn sum_squared<'a>(known: impl Iterator<Item = &'a LocalCoordinate>, predicted: &[LocalCoordinate]) -> f64 {
    known.zip(predicted).map(|(k, p)| k.squared_distance(p)).sum()
}

/// Cost function bound to one record set, with evaluation bookkeeping.
///
/// Shared across rayon workers, so counters are atomic. The first
/// non-recoverable projector failure is remembered; afterwards every
/// evaluation short-circuits to `+∞` without invoking the projector again.
pub struct ResidualCost<'a> {
    projector: &'a dyn ForwardProjector,
    records: &'a [CorrespondenceRecord],
    points: Vec<GeodeticCoordinate>,
    evaluations: AtomicUsize,
    infeasible: AtomicUsize,
    fatal: OnceLock<ProjectionError>,
}

impl<'a> ResidualCost<'a> {
    pub fn new(projector: &'a dyn ForwardProjector, records: &'a [CorrespondenceRecord]) -> Self {
        Self {
            projector,
            records,
            points: records.iter().map(|r| r.geodetic).collect(),
            evaluations: AtomicUsize::new(0),
            infeasible: AtomicUsize::new(0),
            fatal: OnceLock::new(),
        }
    }

    pub fn projector(&self) -> &'a dyn ForwardProjector {
        self.projector
    }

    pub fn records(&self) -> &'a [CorrespondenceRecord] {
        self.records
    }

    pub fn evaluate(&self, params: &ProjectionParameters) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        match self.project(params) {
            Ok(predicted) => {
                let v = sum_squared(self.records.iter().map(|r| &r.local), &predicted);
                if v.is_nan() {
                    self.infeasible.fetch_add(1, Ordering::Relaxed);
                    f64::INFINITY
                } else {
                    v
                }
            }
            Err(_) => f64::INFINITY,
        }
    }

    /// Project all records with unit scale and no offsets about `central_longitude`.
    pub fn project_unit(&self, central_longitude: f64) -> Result<Vec<LocalCoordinate>, ProjectionError> {
        self.project(&ProjectionParameters::unit(central_longitude))
    }

    fn project(&self, params: &ProjectionParameters) -> Result<Vec<LocalCoordinate>, ProjectionError> {
        if let Some(err) = self.fatal.get() {
            return Err(err.clone());
        }
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.projector.project_batch(params, &self.points).inspect_err(|err| {
            self.infeasible.fetch_add(1, Ordering::Relaxed);
            log::trace!("projection failed for {:?}: {err}", params.to_array());
            if !err.is_recoverable() {
                let _ = self.fatal.set(err.clone());
            }
        })
    }

    /// Number of projector invocations so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Number of evaluations priced as `+∞`.
    pub fn infeasible(&self) -> usize {
        self.infeasible.load(Ordering::Relaxed)
    }

    pub fn fatal_error(&self) -> Option<&ProjectionError> {
        self.fatal.get()
    }
}
