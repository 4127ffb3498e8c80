//! Leave-one-out cross-validation.
//!
//! Each record is held out in turn; the remaining records are refit with the
//! same bounds and search settings and the held-out record's prediction
//! residual is reported. This estimates how well the fit generalizes to
//! points it has not seen.

use crate::domain::{CorrespondenceRecord, ParameterBounds, ProjectionParameters, RecordResidual, ResidualSummary, SearchConfig};
use crate::error::AppError;
use crate::fit::cost::ResidualCost;
use crate::fit::search::search;
use crate::projection::ForwardProjector;
use crate::report::{compute_residuals, summarize};

/// Minimum record count for leave-one-out.
pub const MIN_RECORDS: usize = 3;

/// One held-out refit.
#[derive(Debug, Clone)]
pub struct Fold {
    /// Parameters fitted without the held-out record.
    pub params: ProjectionParameters,
    pub cost: f64,
    /// Prediction residual of the held-out record.
    pub residual: RecordResidual,
}

#[derive(Debug, Clone)]
pub struct CrossValidation {
    pub folds: Vec<Fold>,
    /// Summary over the held-out residuals.
    pub summary: ResidualSummary,
}

/// Refit once per record, excluding it each time.
///
/// Folds run one after another; each search is already parallel inside.
pub fn leave_one_out(
    projector: &dyn ForwardProjector,
    records: &[CorrespondenceRecord],
    bounds: &ParameterBounds,
    config: &SearchConfig,
) -> Result<CrossValidation, AppError> {
    if records.len() < MIN_RECORDS {
        return Err(AppError::new(
            3,
            format!(
                "Leave-one-out needs at least {MIN_RECORDS} records (got {}).",
                records.len()
            ),
        ));
    }

    let mut folds = Vec::with_capacity(records.len());
    for (i, held_out) in records.iter().enumerate() {
        let training: Vec<CorrespondenceRecord> = records
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, r)| r.clone())
            .collect();

        let cost = ResidualCost::new(projector, &training);
        let outcome = search(&cost, bounds, config)?;
        let mut residual = compute_residuals(projector, &outcome.params, std::slice::from_ref(held_out))?;
        let Some(residual) = residual.pop() else {
            return Err(AppError::new(4, "No residual for held-out record."));
        };
        log::info!(
            "leave-one-out {}/{}: '{}' predicted within {:.3} m",
            i + 1,
            records.len(),
            held_out.label,
            residual.distance
        );
        folds.push(Fold {
            params: outcome.params,
            cost: outcome.cost,
            residual,
        });
    }

    let residuals: Vec<RecordResidual> = folds.iter().map(|f| f.residual.clone()).collect();
    Ok(CrossValidation {
        summary: summarize(&residuals),
        folds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic_records;
    use crate::domain::GeodeticCoordinate;
    use crate::projection::TransverseMercator;

    fn truth() -> ProjectionParameters {
        ProjectionParameters::new(0.9996, 57.0, 75_756.0, -2_894_933.0)
    }

    fn quick() -> SearchConfig {
        SearchConfig {
            chains: 2,
            max_iter: 200,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn noise_free_records_predict_held_out_points() {
        let tm = TransverseMercator::default();
        let points: Vec<GeodeticCoordinate> = [(24.4, 56.6), (25.7, 58.5), (27.4, 57.2), (26.1, 53.9), (24.9, 55.2)]
            .iter()
            .map(|&(lat, lon)| GeodeticCoordinate::new(lat, lon).unwrap())
            .collect();
        let records = synthetic_records(&tm, &truth(), &points).unwrap();

        let cv = leave_one_out(&tm, &records, &ParameterBounds::default(), &quick()).unwrap();
        assert_eq!(cv.folds.len(), 5);
        assert!(cv.summary.max < 1.0, "max held-out residual {}", cv.summary.max);
    }

    #[test]
    fn requires_three_records() {
        let tm = TransverseMercator::default();
        let points = vec![
            GeodeticCoordinate::new(24.4, 56.6).unwrap(),
            GeodeticCoordinate::new(25.7, 58.5).unwrap(),
        ];
        let records = synthetic_records(&tm, &truth(), &points).unwrap();
        let err = leave_one_out(&tm, &records, &ParameterBounds::default(), &quick()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
