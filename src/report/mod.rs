//! Fit validation: per-record residuals and summary statistics.

pub mod format;

use crate::domain::{CorrespondenceRecord, GeodeticCoordinate, ProjectionParameters, RecordResidual, ResidualSummary};
use crate::error::AppError;
use crate::projection::ForwardProjector;

/// Residual (known − predicted) for each record under `params`.
///
/// Unlike the cost function, a projection failure here is an error: the
/// parameters are final and the caller asked for every record.
pub fn compute_residuals(
    projector: &dyn ForwardProjector,
    params: &ProjectionParameters,
    records: &[CorrespondenceRecord],
) -> Result<Vec<RecordResidual>, AppError> {
    let points: Vec<GeodeticCoordinate> = records.iter().map(|r| r.geodetic).collect();
    let predicted = projector.project_batch(params, &points)?;
    if predicted.len() != records.len() {
        return Err(AppError::new(
            4,
            format!(
                "Projector returned {} points for {} records.",
                predicted.len(),
                records.len()
            ),
        ));
    }

    let mut out = Vec::with_capacity(records.len());
    for (record, p) in records.iter().zip(predicted) {
        let dx = record.local.x - p.x;
        let dz = record.local.z - p.z;
        let distance = dx.hypot(dz);
        if !distance.is_finite() {
            return Err(AppError::new(
                4,
                format!("Non-finite residual for record {}.", record.label),
            ));
        }
        out.push(RecordResidual {
            record: record.clone(),
            predicted: p,
            dx,
            dz,
            distance,
        });
    }
    Ok(out)
}

/// Aggregate residual statistics. An empty slice summarizes to all zeros.
pub fn summarize(residuals: &[RecordResidual]) -> ResidualSummary {
    let n = residuals.len();
    if n == 0 {
        return ResidualSummary {
            n: 0,
            sse: 0.0,
            rms: 0.0,
            max: 0.0,
            mean_dx: 0.0,
            mean_dz: 0.0,
        };
    }
    let sse: f64 = residuals.iter().map(|r| r.distance * r.distance).sum();
    let max = residuals.iter().map(|r| r.distance).fold(0.0_f64, f64::max);
    let mean_dx = residuals.iter().map(|r| r.dx).sum::<f64>() / n as f64;
    let mean_dz = residuals.iter().map(|r| r.dz).sum::<f64>() / n as f64;
    ResidualSummary {
        n,
        sse,
        rms: (sse / n as f64).sqrt(),
        max,
        mean_dx,
        mean_dz,
    }
}

/// The `top_n` records with the largest residual distance, worst first.
pub fn rank_worst(residuals: &[RecordResidual], top_n: usize) -> Vec<RecordResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| b.distance.partial_cmp(&a.distance).unwrap_or(std::cmp::Ordering::Equal));
    sorted.truncate(top_n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LocalCoordinate;
    use crate::projection::TransverseMercator;

    fn record(label: &str, lat: f64, lon: f64, x: f64, z: f64) -> CorrespondenceRecord {
        CorrespondenceRecord {
            label: label.to_string(),
            geodetic: GeodeticCoordinate::new(lat, lon).unwrap(),
            local: LocalCoordinate::new(x, z),
        }
    }

    #[test]
    fn residuals_are_known_minus_predicted() {
        let tm = TransverseMercator::default();
        let params = ProjectionParameters::new(0.9996, 57.0, 0.0, 0.0);
        let exact = tm
            .project(&params, &GeodeticCoordinate::new(25.0, 57.0).unwrap())
            .unwrap();
        let records = vec![record("a", 25.0, 57.0, exact.x + 3.0, exact.z - 4.0)];

        let residuals = compute_residuals(&tm, &params, &records).unwrap();
        assert!((residuals[0].dx - 3.0).abs() < 1e-6);
        assert!((residuals[0].dz + 4.0).abs() < 1e-6);
        assert!((residuals[0].distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn projection_failure_is_an_error() {
        let tm = TransverseMercator::default();
        let params = ProjectionParameters::new(0.9996, 57.0, 0.0, 0.0);
        // 123 degrees from the central meridian cannot be projected.
        let records = vec![record("far", 10.0, -180.0, 0.0, 0.0)];
        let err = compute_residuals(&tm, &params, &records).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn summary_statistics() {
        let tm = TransverseMercator::default();
        let params = ProjectionParameters::new(1.0, 0.0, 0.0, 0.0);
        let origin = tm
            .project(&params, &GeodeticCoordinate::new(0.0, 0.0).unwrap())
            .unwrap();
        let records = vec![
            record("a", 0.0, 0.0, origin.x + 3.0, origin.z + 4.0),
            record("b", 0.0, 0.0, origin.x - 3.0, origin.z),
        ];
        let residuals = compute_residuals(&tm, &params, &records).unwrap();
        let s = summarize(&residuals);
        assert_eq!(s.n, 2);
        assert!((s.sse - 34.0).abs() < 1e-6);
        assert!((s.rms - 17.0_f64.sqrt()).abs() < 1e-6);
        assert!((s.max - 5.0).abs() < 1e-6);
        assert!(s.mean_dx.abs() < 1e-6);
        assert!((s.mean_dz - 2.0).abs() < 1e-6);

        let worst = rank_worst(&residuals, 1);
        assert_eq!(worst.len(), 1);
        assert_eq!(worst[0].record.label, "a");

        assert_eq!(summarize(&[]).n, 0);
    }
}
