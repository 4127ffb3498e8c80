//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place keeps the core workflow testable without argv:
//! load records -> search -> residuals -> optional holdout / leave-one-out
//!
//! The CLI handlers then only deal with presentation and exports.

use std::path::PathBuf;

use crate::domain::{CalibrationConfig, CorrespondenceRecord, RecordResidual, ResidualSummary};
use crate::error::AppError;
use crate::fit::{CrossValidation, ResidualCost, SearchOutcome, leave_one_out, search};
use crate::io::ingest::load_records;
use crate::projection::{ForwardProjector, projector_for_config};
use crate::report::{compute_residuals, summarize};

/// Residuals of records that took no part in the fit.
#[derive(Debug, Clone)]
pub struct HoldoutReport {
    pub path: PathBuf,
    pub residuals: Vec<RecordResidual>,
    pub summary: ResidualSummary,
}

/// All computed outputs of a single `tmcal fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub records: Vec<CorrespondenceRecord>,
    pub projector: &'static str,
    pub outcome: SearchOutcome,
    pub residuals: Vec<RecordResidual>,
    pub summary: ResidualSummary,
    pub holdout: Option<HoldoutReport>,
    pub cross_validation: Option<CrossValidation>,
}

/// Execute the full pipeline with the projector named in `config`.
pub fn run_fit(config: &CalibrationConfig) -> Result<RunOutput, AppError> {
    let projector = projector_for_config(config)?;
    run_fit_with_projector(config, projector.as_ref())
}

/// Execute the full pipeline with a caller-supplied projector.
pub fn run_fit_with_projector(
    config: &CalibrationConfig,
    projector: &dyn ForwardProjector,
) -> Result<RunOutput, AppError> {
    let records = load_records(&config.input)?;
    run_fit_with_records(config, projector, records)
}

/// Execute the pipeline on records already in memory.
pub fn run_fit_with_records(
    config: &CalibrationConfig,
    projector: &dyn ForwardProjector,
    records: Vec<CorrespondenceRecord>,
) -> Result<RunOutput, AppError> {
    log::info!(
        "fitting {} records with {} ({} chains x {} iterations, seed {})",
        records.len(),
        projector.name(),
        config.search.chains,
        config.search.max_iter,
        config.search.seed
    );

    let cost = ResidualCost::new(projector, &records);
    let outcome = search(&cost, &config.bounds, &config.search)?;

    let residuals = compute_residuals(projector, &outcome.params, &records)?;
    let summary = summarize(&residuals);

    let holdout = match &config.holdout {
        Some(path) => {
            let held = load_records(path)?;
            let residuals = compute_residuals(projector, &outcome.params, &held)?;
            let summary = summarize(&residuals);
            log::info!("holdout: {} records, rms {:.3} m", summary.n, summary.rms);
            Some(HoldoutReport {
                path: path.clone(),
                residuals,
                summary,
            })
        }
        None => None,
    };

    let cross_validation = if config.leave_one_out {
        Some(leave_one_out(projector, &records, &config.bounds, &config.search)?)
    } else {
        None
    };

    Ok(RunOutput {
        records,
        projector: projector.name(),
        outcome,
        residuals,
        summary,
        holdout,
        cross_validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn reference_csv() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data/persian_gulf.csv"))
    }

    #[test]
    fn known_fit_reproduces_reference_map() {
        let config = CalibrationConfig::new(reference_csv());
        let run = run_fit(&config).unwrap();

        assert_eq!(run.records.len(), 6);
        let p = run.outcome.params;
        assert!((p.scale_factor - 0.9996).abs() < 1e-4, "{p:?}");
        assert!((p.central_longitude - 57.0).abs() < 0.01, "{p:?}");
        assert!((p.false_easting - 75_756.0).abs() < 50.0, "{p:?}");
        assert!((p.false_northing + 2_894_933.0).abs() < 50.0, "{p:?}");

        let origin = run
            .residuals
            .iter()
            .find(|r| r.record.local.x == 0.0 && r.record.local.z == 0.0)
            .unwrap();
        assert!(origin.distance < 5.0, "origin residual {}", origin.distance);
        assert!(run.residuals.iter().all(|r| r.distance < 300.0));
        assert!(run.summary.rms < 5.0, "rms {}", run.summary.rms);
    }

    #[test]
    fn holdout_file_is_validated_separately() {
        let mut config = CalibrationConfig::new(reference_csv());
        config.holdout = Some(reference_csv());
        config.search.max_iter = 200;
        let run = run_fit(&config).unwrap();

        let holdout = run.holdout.unwrap();
        assert_eq!(holdout.summary.n, 6);
        assert!((holdout.summary.rms - run.summary.rms).abs() < 1e-9);
    }

    #[test]
    fn missing_input_is_an_input_error() {
        let config = CalibrationConfig::new(Path::new("/nonexistent/tmcal.csv").to_path_buf());
        assert_eq!(run_fit(&config).unwrap_err().exit_code(), 2);
    }
}
